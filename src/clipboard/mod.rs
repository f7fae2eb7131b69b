//! 剪贴板粘贴桥接模块
//!
//! # 设计思路
//!
//! 把两种粘贴投递方式归一为一次 `handler(Option<ImageHandle>)` 调用：
//! - **策略**：初始化时选定 `EventDataStrategy` 或 `FocusTargetStrategy`
//! - **挑选**：优先文件类图片条目；一次粘贴只解码第一张图片，其余忽略
//! - **URL 回退**：只有 URL/文本时视为“没有图片”，远程地址绝不拉取；
//!   内联 `data:image/...` 仅在配置允许时接受
//! - **程序化粘贴**：`trigger_paste` 失败时返回 `PasteBlocked`；聚焦等待是异步的
//!
//! # 实现思路
//!
//! - `locate_image` 是同步的一步，只决定“用哪一项”，不解码。
//! - `finish_paste` 负责解码并回调 handler；`paste` 是两步的组合。
//!   暂存区协调器会在两步之间签发解码票据。

pub mod strategy;
pub mod system;

use bytes::Bytes;

use crate::config::ImportConfig;
use crate::decoder::{DecodeLimits, ImageDecoder, ImageHandle, ImageSource, is_image_media_type};
use crate::error::ImportError;
use strategy::{ClipboardContents, EventDataStrategy, FocusTargetStrategy, PasteStrategy};

/// 剪贴板中的一个条目。
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardItem {
    /// 文件类条目，附带声明的媒体类型。
    File { media_type: String, bytes: Bytes },
    /// 字符串类条目（text/plain、text/html、text/uri-list 等）。
    Text { media_type: String, text: String },
    /// 系统剪贴板中已解码的 RGBA 位图。
    Bitmap {
        width: usize,
        height: usize,
        bytes: Bytes,
    },
}

impl ClipboardItem {
    fn is_image(&self) -> bool {
        match self {
            Self::File { media_type, .. } => is_image_media_type(media_type),
            Self::Bitmap { .. } => true,
            Self::Text { .. } => false,
        }
    }

    fn into_source(self) -> Option<ImageSource> {
        match self {
            Self::File { media_type, bytes } => Some(ImageSource::Blob { bytes, media_type }),
            Self::Bitmap {
                width,
                height,
                bytes,
            } => Some(ImageSource::Bitmap {
                width,
                height,
                bytes,
            }),
            Self::Text { .. } => None,
        }
    }
}

/// 平台投递的一次粘贴。
#[derive(Debug, Clone, PartialEq)]
pub enum PasteEvent {
    /// 粘贴事件自身携带剪贴板数据。
    EventData {
        files: Vec<ClipboardItem>,
        items: Vec<ClipboardItem>,
    },
    /// 聚焦的可编辑目标收到了粘贴，数据需另行读取。
    FocusTarget,
}

/// 初始化时选择的投递方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    EventData,
    FocusTarget,
}

/// 一次粘贴的处理结果。
#[derive(Debug)]
pub struct PasteResult {
    pub outcome: Result<ImageHandle, ImportError>,
    /// 宿主是否应阻止平台默认的粘贴处理。
    pub prevent_default: bool,
}

pub type PasteHandler = Box<dyn FnMut(Option<ImageHandle>) + Send>;

/// 剪贴板桥接器。
pub struct ClipboardBridge {
    strategy: Box<dyn PasteStrategy>,
    decoder: ImageDecoder,
    prevent_default: bool,
    allow_inline_data_urls: bool,
    handler: Option<PasteHandler>,
}

impl ClipboardBridge {
    /// 按投递方式初始化，使用系统剪贴板与按键模拟。
    pub fn init(mode: PasteMode, config: &ImportConfig) -> Self {
        let strategy: Box<dyn PasteStrategy> = match mode {
            PasteMode::EventData => Box::new(EventDataStrategy::new()),
            PasteMode::FocusTarget => Box::new(FocusTargetStrategy::system()),
        };
        Self::with_strategy(strategy, config)
    }

    pub fn with_strategy(strategy: Box<dyn PasteStrategy>, config: &ImportConfig) -> Self {
        log::info!("📋 剪贴板桥接已初始化 - 策略: {}", strategy.name());
        Self {
            strategy,
            decoder: ImageDecoder::new(DecodeLimits::from(config)),
            prevent_default: config.prevent_default_paste,
            allow_inline_data_urls: config.allow_inline_data_urls,
            handler: None,
        }
    }

    /// 注册结果回调；每次粘贴恰好调用一次，没有图片时参数为 `None`。
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: FnMut(Option<ImageHandle>) + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// 找出本次粘贴要解码的那一项（只取第一张图片）。
    pub fn locate_image(&mut self, event: &PasteEvent) -> Result<ImageSource, ImportError> {
        match self.strategy.extract(event)? {
            ClipboardContents::Items(items) => {
                let total = items.len();
                let source = items
                    .into_iter()
                    .find(ClipboardItem::is_image)
                    .and_then(ClipboardItem::into_source)
                    .ok_or_else(|| {
                        ImportError::ClipboardUnavailable(format!("{} 个剪贴板条目中没有图片", total))
                    })?;
                if total > 1 {
                    log::debug!("📋 剪贴板共 {} 个条目，只使用第一张图片", total);
                }
                Ok(source)
            }
            ClipboardContents::Url(url) => {
                if !self.allow_inline_data_urls {
                    return Err(ImportError::ClipboardUnavailable(
                        "剪贴板中只有 URL/文本表示".to_string(),
                    ));
                }
                let (media_type, bytes) =
                    strategy::parse_inline_image_url(&url, self.decoder.limits().max_file_size)?;
                Ok(ImageSource::Blob { bytes, media_type })
            }
            ClipboardContents::Nothing => Err(ImportError::ClipboardUnavailable(
                "剪贴板中没有数据".to_string(),
            )),
        }
    }

    /// 解码已定位的内容并回调 handler。
    pub async fn finish_paste(&mut self, located: Result<ImageSource, ImportError>) -> PasteResult {
        let outcome = match located {
            Ok(source) => self.decoder.decode(source).await,
            Err(error) => Err(error),
        };

        match &outcome {
            Ok(image) => log::info!(
                "📋 粘贴图片成功 - image={} 尺寸: {}x{}",
                image.id(),
                image.width(),
                image.height()
            ),
            Err(error) => log::info!("📋 粘贴未得到图片: {}", error),
        }

        if let Some(handler) = self.handler.as_mut() {
            handler(outcome.as_ref().ok().cloned());
        }

        PasteResult {
            outcome,
            prevent_default: self.prevent_default,
        }
    }

    /// 处理一次粘贴：定位 + 解码 + 回调。
    pub async fn paste(&mut self, event: &PasteEvent) -> PasteResult {
        let located = self.locate_image(event);
        self.finish_paste(located).await
    }

    /// 以程序方式触发平台粘贴。
    ///
    /// 聚焦等待期间让出运行时；宿主权限策略拒绝时返回 `PasteBlocked`。
    pub async fn trigger_paste(&mut self) -> Result<(), ImportError> {
        let delay = self.strategy.focus_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.strategy.trigger().inspect_err(|error| {
            log::warn!("⚠️ 程序化粘贴失败: {}", error);
        })
    }
}
