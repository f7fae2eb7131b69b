//! # 导入协调器
//!
//! ## 设计思路
//!
//! 三条导入通道汇聚到同一个暂存区，再由一次“放置”交给绘图面：
//!
//! ```text
//!  文件拖到暂存区 ──┐
//!  剪贴板粘贴 ──────┼─▶ Dropzone (Staged / Cropping) ── 拖出 ──┐
//!                   │                                          ▼
//!  文件直接拖到目标 ─┴──────────────────────────────────▶ drop_on_target ─▶ PlacementEvent
//! ```
//!
//! - 协调器持有唯一的 `Dropzone`（`Arc<Mutex<_>>`），宿主每个导入界面构造一个实例。
//! - 粘贴的图片只进暂存区，不会直接落到绘图面上。
//! - 任何位置的拖放都会阻止平台默认处理（打开文件 / 导航），暂存区与目标之外的落点直接吞掉。
//!
//! ## 实现思路
//!
//! - 每次异步解码前先同步拒绝非图片内容，再签发 `DecodeTicket`；
//!   解码完成后带着票据回到状态机，过期结果由状态机丢弃。
//! - `Dropzone` 的 std 锁只在同步段内持有，绝不跨越 `.await`。
//! - 放置坐标：`目标内指针偏移 - 抓取偏移`，没有抓取偏移时直接用目标内偏移。

use std::sync::{Arc, Mutex, MutexGuard};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tokio::sync::mpsc::UnboundedSender;

use crate::clipboard::{ClipboardBridge, PasteEvent, PasteMode};
use crate::config::ImportConfig;
use crate::crop::CropSelection;
use crate::decoder::{DecodeLimits, ImageDecoder, ImageHandle, ImageSource};
use crate::dropzone::{DecodeTicket, Dropzone, DropzoneEvent, DropzoneView, Effect, Transition};
use crate::error::{AppError, ImportError, ImportNotice};
use crate::geometry::{ElementRect, Offset, PointerPosition, offset_within};

/// 交给绘图面的放置事件：图片左上角相对目标左上角的位置。
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementEvent {
    pub x: f64,
    pub y: f64,
    pub image: ImageHandle,
}

impl PlacementEvent {
    pub fn new(position: Offset, image: ImageHandle) -> Self {
        Self {
            x: position.x,
            y: position.y,
            image,
        }
    }
}

impl Serialize for PlacementEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PlacementEvent", 5)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("width", &self.image.width())?;
        state.serialize_field("height", &self.image.height())?;
        state.serialize_field("imageId", &self.image.id())?;
        state.end()
    }
}

/// 宿主绘图面。
pub trait DrawingSurface: Send {
    fn place_image(&mut self, event: PlacementEvent);

    /// 展示一条导入提示（拒绝、解码失败等）。
    fn notify(&mut self, notice: ImportNotice);
}

/// 通过通道投递给宿主的绘图面命令。
#[derive(Debug, Clone)]
pub enum SurfaceCommand {
    Place(PlacementEvent),
    Notify(ImportNotice),
}

impl DrawingSurface for UnboundedSender<SurfaceCommand> {
    fn place_image(&mut self, event: PlacementEvent) {
        if self.send(SurfaceCommand::Place(event)).is_err() {
            log::warn!("⚠️ 绘图面通道已关闭，放置事件被丢弃");
        }
    }

    fn notify(&mut self, notice: ImportNotice) {
        if self.send(SurfaceCommand::Notify(notice)).is_err() {
            log::warn!("⚠️ 绘图面通道已关闭，提示被丢弃");
        }
    }
}

/// 拖拽经过的区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragRegion {
    Dropzone,
    Target,
    Elsewhere,
}

/// 对 drag-over 的响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOverResponse {
    /// 总是为 `true`：任何位置都不交给平台默认处理。
    pub prevent_default: bool,
    pub accept: bool,
}

/// 一次放下的内容。
#[derive(Debug, Clone)]
pub struct DropPayload {
    pub pointer: PointerPosition,
    /// 目标（或暂存区）在视口中的矩形。
    pub target_rect: ElementRect,
    pub files: Vec<ImageSource>,
}

impl DropPayload {
    pub fn new(pointer: PointerPosition, target_rect: ElementRect, files: Vec<ImageSource>) -> Self {
        Self {
            pointer,
            target_rect,
            files,
        }
    }
}

/// 文件拖入 / 粘贴到暂存区的结果。
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Staged(ImageHandle),
    Rejected(ImportError),
    /// 解码完成时已有更新的导入，结果被丢弃。
    Stale(ImageHandle),
    DropzoneDisabled,
    /// 放下的内容里没有文件。
    Nothing,
}

/// 一次粘贴的结果。
#[derive(Debug, Clone)]
pub struct PasteOutcome {
    pub ingest: IngestOutcome,
    pub prevent_default: bool,
}

/// 放到目标上的结果。
#[derive(Debug, Clone)]
pub enum TargetDropOutcome {
    Placed(PlacementEvent),
    Rejected(ImportError),
    Nothing,
}

/// 导入协调器。
pub struct ImportCoordinator<S: DrawingSurface> {
    dropzone: Arc<Mutex<Dropzone>>,
    decoder: ImageDecoder,
    clipboard: tokio::sync::Mutex<ClipboardBridge>,
    surface: Mutex<S>,
    config: ImportConfig,
}

impl<S: DrawingSurface> ImportCoordinator<S> {
    /// 按粘贴投递方式构造，剪贴板使用系统实现。
    pub fn new(config: ImportConfig, mode: PasteMode, surface: S) -> Result<Self, AppError> {
        let clipboard = ClipboardBridge::init(mode, &config);
        Self::with_clipboard(config, clipboard, surface)
    }

    pub fn with_clipboard(
        config: ImportConfig,
        clipboard: ClipboardBridge,
        surface: S,
    ) -> Result<Self, AppError> {
        config.validate()?;
        log::info!(
            "🚀 导入协调器已创建 - dropzone: {} cropping: {} paste: {}",
            config.enable_dropzone,
            config.enable_cropping,
            clipboard.strategy_name()
        );

        Ok(Self {
            dropzone: Arc::new(Mutex::new(Dropzone::new(&config))),
            decoder: ImageDecoder::new(DecodeLimits::from(&config)),
            clipboard: tokio::sync::Mutex::new(clipboard),
            surface: Mutex::new(surface),
            config,
        })
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 暂存区句柄，供宿主读取状态。
    pub fn dropzone(&self) -> Arc<Mutex<Dropzone>> {
        Arc::clone(&self.dropzone)
    }

    pub fn view(&self) -> Result<DropzoneView, AppError> {
        Ok(self.lock_dropzone()?.view())
    }

    pub fn drag_over(&self, region: DragRegion) -> DragOverResponse {
        let accept = match region {
            DragRegion::Dropzone => self.config.enable_dropzone,
            DragRegion::Target => true,
            DragRegion::Elsewhere => false,
        };
        DragOverResponse {
            prevent_default: true,
            accept,
        }
    }

    pub fn drag_enter(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::DragEnter)
    }

    pub fn drag_leave(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::DragLeave)
    }

    /// 文件拖到暂存区：解码第一个文件并暂存。
    pub async fn drop_on_dropzone(&self, payload: DropPayload) -> Result<IngestOutcome, AppError> {
        if !self.config.enable_dropzone {
            log::debug!("⏭️ 暂存区未启用，忽略拖放");
            return Ok(IngestOutcome::DropzoneDisabled);
        }

        let Some(source) = payload.files.into_iter().next() else {
            self.apply(DropzoneEvent::DragLeave)?;
            return Ok(IngestOutcome::Nothing);
        };

        if let Err(error) = self.decoder.check_media_type(&source) {
            return self.reject(error);
        }

        let ticket = self.lock_dropzone()?.begin_decode();
        match self.decoder.decode(source).await {
            Ok(image) => self.commit(ticket, image),
            Err(error) => self.reject(error),
        }
    }

    /// 开始从暂存区拖出图片，记录抓取点相对图片左上角的偏移。
    pub fn begin_drag_off(
        &self,
        pointer: PointerPosition,
        image_rect: ElementRect,
    ) -> Result<Transition, AppError> {
        let grab = offset_within(pointer, &image_rect);
        self.apply(DropzoneEvent::DragStarted { grab })
    }

    pub fn end_drag_off(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::DragEnded)
    }

    /// 放到绘图目标上。
    ///
    /// 有抓取偏移时交出暂存图片并按抓取点修正位置；
    /// 否则解码第一个文件，按指针位置放置。
    pub async fn drop_on_target(&self, payload: DropPayload) -> Result<TargetDropOutcome, AppError> {
        let target = offset_within(payload.pointer, &payload.target_rect);

        let handed_off = {
            let mut dropzone = self.lock_dropzone()?;
            if dropzone.pending_offset().is_some() {
                Some(dropzone.apply(DropzoneEvent::HandOff))
            } else {
                None
            }
        };

        if let Some(Transition {
            effect: Effect::HandedOff { image, grab },
            ..
        }) = handed_off
        {
            let event = PlacementEvent::new(target - grab.unwrap_or_default(), image);
            self.place(event.clone())?;
            return Ok(TargetDropOutcome::Placed(event));
        }

        let Some(source) = payload.files.into_iter().next() else {
            log::debug!("⏭️ 目标上的拖放没有文件也没有暂存图片");
            return Ok(TargetDropOutcome::Nothing);
        };

        match self.decoder.decode(source).await {
            Ok(image) => {
                let event = PlacementEvent::new(target, image);
                self.place(event.clone())?;
                Ok(TargetDropOutcome::Placed(event))
            }
            Err(error) => {
                log::warn!("🚫 目标上的拖放被拒绝: {}", error);
                self.notify(ImportNotice::from(&error))?;
                Ok(TargetDropOutcome::Rejected(error))
            }
        }
    }

    /// 落在暂存区和目标之外：吞掉，不交给平台。
    pub fn drop_elsewhere(&self) -> DragOverResponse {
        log::debug!("🫳 吞掉了目标之外的拖放");
        DragOverResponse {
            prevent_default: true,
            accept: false,
        }
    }

    /// 粘贴：图片只进入暂存区。
    pub async fn paste(&self, event: &PasteEvent) -> Result<PasteOutcome, AppError> {
        if !self.config.enable_dropzone {
            return Ok(PasteOutcome {
                ingest: IngestOutcome::DropzoneDisabled,
                prevent_default: false,
            });
        }

        let mut clipboard = self.clipboard.lock().await;
        let (ingest, prevent_default) = match clipboard.locate_image(event) {
            Ok(source) => {
                let ticket = self.lock_dropzone()?.begin_decode();
                let result = clipboard.finish_paste(Ok(source)).await;
                let ingest = match result.outcome {
                    Ok(image) => self.commit(ticket, image)?,
                    Err(error) => self.reject(error)?,
                };
                (ingest, result.prevent_default)
            }
            Err(error) => {
                let result = clipboard.finish_paste(Err(error.clone())).await;
                (self.reject(error)?, result.prevent_default)
            }
        };
        drop(clipboard);

        Ok(PasteOutcome {
            ingest,
            prevent_default,
        })
    }

    /// 程序化触发粘贴；被拒绝时同时提示宿主。
    pub async fn trigger_paste(&self) -> Result<(), AppError> {
        let result = self.clipboard.lock().await.trigger_paste().await;
        if let Err(error) = &result {
            self.notify(ImportNotice::from(error))?;
        }
        result.map_err(AppError::from)
    }

    pub fn enter_crop(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::EnterCrop)
    }

    pub fn adjust_crop(&self, selection: CropSelection) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::AdjustCrop(selection))
    }

    pub fn confirm_crop(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::ConfirmCrop)
    }

    pub fn cancel_crop(&self) -> Result<Transition, AppError> {
        self.apply(DropzoneEvent::CancelCrop)
    }

    fn lock_dropzone(&self) -> Result<MutexGuard<'_, Dropzone>, AppError> {
        self.dropzone
            .lock()
            .map_err(|e| AppError::State(format!("暂存区锁已中毒: {}", e)))
    }

    fn apply(&self, event: DropzoneEvent) -> Result<Transition, AppError> {
        Ok(self.lock_dropzone()?.apply(event))
    }

    fn commit(&self, ticket: DecodeTicket, image: ImageHandle) -> Result<IngestOutcome, AppError> {
        let transition = self.apply(DropzoneEvent::Decoded {
            ticket,
            image: image.clone(),
        })?;

        Ok(match transition.effect {
            Effect::Staged { .. } => IngestOutcome::Staged(image),
            _ => IngestOutcome::Stale(image),
        })
    }

    fn reject(&self, error: ImportError) -> Result<IngestOutcome, AppError> {
        let transition = self.apply(DropzoneEvent::Rejected(error.clone()))?;
        if let Effect::Rejected(notice) = transition.effect {
            self.notify(notice)?;
        }
        Ok(IngestOutcome::Rejected(error))
    }

    fn place(&self, event: PlacementEvent) -> Result<(), AppError> {
        log::info!(
            "🎯 放置图片 - image={} 位置: ({:.1}, {:.1}) 尺寸: {}x{}",
            event.image.id(),
            event.x,
            event.y,
            event.image.width(),
            event.image.height()
        );
        self.lock_surface()?.place_image(event);
        Ok(())
    }

    fn notify(&self, notice: ImportNotice) -> Result<(), AppError> {
        self.lock_surface()?.notify(notice);
        Ok(())
    }

    fn lock_surface(&self) -> Result<MutexGuard<'_, S>, AppError> {
        self.surface
            .lock()
            .map_err(|e| AppError::State(format!("绘图面锁已中毒: {}", e)))
    }
}
