//! # 图片导入核心 — 命令行入口
//!
//! 无界面地驱动一次导入会话：解码文件，可选地暂存并裁剪，再放到目标上，
//! 把得到的放置事件以 JSON 打印到标准输出。提示信息输出到标准错误。
//!
//! ```text
//! sketch-import --input photo.png --target 100,200 --pointer 150,230
//! sketch-import -i photo.png --stage --crop 10,10,100,80 --grab 20,15 --target 0,0 --pointer 300,200
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;

use sketch_import::{
    AppError, CropSelection, DropPayload, Effect, ElementRect, ImageSource, ImportConfig, ImportCoordinator,
    IngestOutcome, PasteMode, PointerPosition, SurfaceCommand, TargetDropOutcome,
};

/// 无界面的图片导入会话。
#[derive(Parser, Debug)]
#[command(
    name = "sketch-import",
    about = "Headless image import session: decode, stage, crop and place an image",
    long_about = "Drive one image import session without a UI.\n\
                  Without --stage the file is dropped straight onto the target.\n\
                  With --stage it is dropped on the staging area first, optionally cropped,\n\
                  then dragged off and dropped onto the target."
)]
struct CliArgs {
    /// 要导入的图片文件。
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// 声明的媒体类型；省略时按文件签名推断。
    #[arg(short, long, value_name = "TYPE")]
    media_type: Option<String>,

    /// 先放入暂存区，再从暂存区拖到目标上。
    #[arg(long)]
    stage: bool,

    /// 暂存后按 x,y,w,h 裁剪（需要 --stage）。
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_crop, requires = "stage")]
    crop: Option<CropSelection>,

    /// 拖出时抓取点相对图片左上角的位置（需要 --stage）。
    #[arg(long, value_name = "X,Y", value_parser = parse_point, default_value = "0,0")]
    grab: (f64, f64),

    /// 目标左上角在视口中的位置。
    #[arg(long, value_name = "X,Y", value_parser = parse_point, default_value = "0,0")]
    target: (f64, f64),

    /// 放下时的指针位置（视口坐标）。
    #[arg(long, value_name = "X,Y", value_parser = parse_point, default_value = "0,0")]
    pointer: (f64, f64),

    /// 设置 JSON 文件（camelCase 键），覆盖默认配置。
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
}

fn parse_numbers<T: std::str::FromStr>(value: &str, count: usize) -> Result<Vec<T>, String> {
    let parts: Vec<T> = value
        .split(',')
        .map(|part| part.trim().parse::<T>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("无法解析数值: {}", value))?;

    if parts.len() != count {
        return Err(format!("需要 {} 个逗号分隔的数值，得到 {}", count, parts.len()));
    }
    Ok(parts)
}

fn parse_point(value: &str) -> Result<(f64, f64), String> {
    let parts = parse_numbers::<f64>(value, 2)?;
    Ok((parts[0], parts[1]))
}

fn parse_crop(value: &str) -> Result<CropSelection, String> {
    let parts = parse_numbers::<u32>(value, 4)?;
    Ok(CropSelection::new(parts[0], parts[1], parts[2], parts[3]))
}

fn load_config(settings: Option<&Path>) -> Result<ImportConfig, AppError> {
    let mut config = ImportConfig::default();
    if let Some(path) = settings {
        let raw = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("设置文件不是合法 JSON: {}", e)))?;
        config.apply_settings(&value)?;
        log::info!("⚙️ 已加载设置文件: {}", path.display());
    }
    Ok(config)
}

fn declared_media_type(path: &Path, explicit: Option<String>) -> String {
    explicit
        .or_else(|| {
            infer::get_from_path(path)
                .ok()
                .flatten()
                .map(|kind| kind.mime_type().to_string())
        })
        .unwrap_or_default()
}

async fn run(args: CliArgs) -> Result<bool, AppError> {
    let config = load_config(args.settings.as_deref())?;
    let (sender, mut receiver) = mpsc::unbounded_channel::<SurfaceCommand>();
    let coordinator = ImportCoordinator::new(config, PasteMode::EventData, sender)?;

    let media_type = declared_media_type(&args.input, args.media_type);
    let source = ImageSource::file(&args.input, media_type);
    let target_rect = ElementRect::new(args.target.0, args.target.1, 0.0, 0.0);
    let pointer = PointerPosition::new(args.pointer.0, args.pointer.1);

    let files = if args.stage {
        let staged = coordinator
            .drop_on_dropzone(DropPayload::new(pointer, target_rect, vec![source]))
            .await?;
        let IngestOutcome::Staged(mut image) = staged else {
            log::warn!("⚠️ 暂存失败: {:?}", staged);
            return Ok(drain(&mut receiver));
        };

        if let Some(selection) = args.crop {
            coordinator.enter_crop()?;
            coordinator.adjust_crop(selection)?;
            if let Effect::CropConfirmed { image: cropped } = coordinator.confirm_crop()?.effect {
                image = cropped;
            }
        }

        let image_rect = ElementRect::new(0.0, 0.0, f64::from(image.width()), f64::from(image.height()));
        coordinator.begin_drag_off(PointerPosition::new(args.grab.0, args.grab.1), image_rect)?;
        Vec::new()
    } else {
        vec![source]
    };

    let outcome = coordinator
        .drop_on_target(DropPayload::new(pointer, target_rect, files))
        .await?;
    if let TargetDropOutcome::Nothing = outcome {
        log::warn!("⚠️ 没有可放置的图片");
    }

    Ok(drain(&mut receiver))
}

/// 输出绘图面收到的命令；返回是否至少放置了一张图片。
fn drain(receiver: &mut mpsc::UnboundedReceiver<SurfaceCommand>) -> bool {
    let mut placed = false;
    while let Ok(command) = receiver.try_recv() {
        match command {
            SurfaceCommand::Place(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    println!("{}", json);
                    placed = true;
                }
                Err(e) => log::error!("❌ 序列化放置事件失败: {}", e),
            },
            SurfaceCommand::Notify(notice) => {
                eprintln!("[{}] {}", notice.code, notice.message);
            }
        }
    }
    placed
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("❌ 导入会话失败: {}", err);
            ExitCode::FAILURE
        }
    }
}
