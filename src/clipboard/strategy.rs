//! # 粘贴投递策略
//!
//! ## 设计思路
//!
//! 平台上存在两种互不兼容的粘贴投递方式：
//!
//! - **事件自带数据**：粘贴事件本身携带剪贴板条目，图片以“文件”形式出现；
//!   条目列表里还可能混有 text/html 等字符串，只有文件项值得关注。
//! - **聚焦目标**：只有可编辑元素获得焦点时才会触发粘贴，剪贴板需要另行读取；
//!   读到的要么是文件（位图），要么是“浏览器内复制的图片”留下的 URL/文本。
//!
//! 两种方式在初始化时选定为一个 `PasteStrategy` 实现，业务逻辑不再按平台分支。

use std::time::Duration;

use bytes::Bytes;

use super::system::{ClipboardAccess, KeystrokePasteTrigger, PasteTrigger, SystemClipboard};
use super::{ClipboardItem, PasteEvent};
use crate::error::ImportError;

/// 策略从一次粘贴中提取出的原始内容。
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardContents {
    /// 文件类条目（可能混有非图片文件）。
    Items(Vec<ClipboardItem>),
    /// 只有 URL / 文本表示。
    Url(String),
    /// 确实没有数据。
    Nothing,
}

/// 粘贴投递策略。
pub trait PasteStrategy: Send {
    fn name(&self) -> &'static str;

    /// 从粘贴投递中提取内容。
    fn extract(&mut self, event: &PasteEvent) -> Result<ClipboardContents, ImportError>;

    /// 触发粘贴前需要等待的聚焦时间。
    fn focus_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// 以程序方式触发一次平台粘贴。
    fn trigger(&mut self) -> Result<(), ImportError>;
}

/// 事件自带数据的策略：只取文件项。
#[derive(Debug, Default)]
pub struct EventDataStrategy;

impl EventDataStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl PasteStrategy for EventDataStrategy {
    fn name(&self) -> &'static str {
        "event-data"
    }

    fn extract(&mut self, event: &PasteEvent) -> Result<ClipboardContents, ImportError> {
        let PasteEvent::EventData { files, items } = event else {
            return Ok(ClipboardContents::Nothing);
        };

        if !files.is_empty() {
            return Ok(ClipboardContents::Items(files.clone()));
        }

        let file_items: Vec<ClipboardItem> = items
            .iter()
            .filter(|item| !matches!(item, ClipboardItem::Text { .. }))
            .cloned()
            .collect();

        if file_items.is_empty() {
            Ok(ClipboardContents::Nothing)
        } else {
            Ok(ClipboardContents::Items(file_items))
        }
    }

    /// 这类平台上程序化粘贴没有效果，必须如实告知调用方。
    fn trigger(&mut self) -> Result<(), ImportError> {
        Err(ImportError::PasteBlocked(
            "当前平台不支持程序化粘贴，请使用 Ctrl+V".to_string(),
        ))
    }
}

/// 聚焦目标策略：剪贴板与事件分离，需要单独读取。
pub struct FocusTargetStrategy {
    clipboard: Box<dyn ClipboardAccess>,
    trigger: Box<dyn PasteTrigger>,
}

impl FocusTargetStrategy {
    pub fn new(clipboard: Box<dyn ClipboardAccess>, trigger: Box<dyn PasteTrigger>) -> Self {
        Self { clipboard, trigger }
    }

    /// 使用系统剪贴板与按键模拟。
    pub fn system() -> Self {
        Self::new(Box::new(SystemClipboard), Box::new(KeystrokePasteTrigger::default()))
    }
}

impl PasteStrategy for FocusTargetStrategy {
    fn name(&self) -> &'static str {
        "focus-target"
    }

    fn extract(&mut self, _event: &PasteEvent) -> Result<ClipboardContents, ImportError> {
        let files = self.clipboard.read_files()?;
        if !files.is_empty() {
            return Ok(ClipboardContents::Items(files));
        }

        // 文件列表为空说明内容来自浏览器内部复制，只剩 URL 表示
        match self.clipboard.read_url()? {
            Some(url) if !url.trim().is_empty() => Ok(ClipboardContents::Url(url)),
            _ => Ok(ClipboardContents::Nothing),
        }
    }

    fn focus_delay(&self) -> Duration {
        self.trigger.focus_delay()
    }

    fn trigger(&mut self) -> Result<(), ImportError> {
        self.trigger.send_paste()
    }
}

/// 解析内联 `data:image/...;base64,` 地址。
///
/// 只接受图片类型的内联数据，远程地址一律不处理。
pub(crate) fn parse_inline_image_url(
    url: &str,
    max_file_size: u64,
) -> Result<(String, Bytes), ImportError> {
    use base64::{Engine as _, engine::general_purpose};

    let normalized = url.trim();
    let Some(rest) = normalized.strip_prefix("data:") else {
        return Err(ImportError::ClipboardUnavailable(
            "剪贴板中只有远程 URL，不会主动拉取".to_string(),
        ));
    };

    let (header, base64_data) = rest
        .split_once(',')
        .ok_or_else(|| ImportError::DecodeFailed("data URL 缺少数据段".to_string()))?;

    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ImportError::DecodeFailed("data URL 缺少 base64 标记".to_string()))?;

    if !crate::decoder::is_image_media_type(media_type) {
        return Err(ImportError::NotAnImage(media_type.to_string()));
    }

    let estimated_len = (base64_data.len() as u64).div_ceil(4) * 3;
    if estimated_len > max_file_size {
        return Err(ImportError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| ImportError::DecodeFailed(format!("Base64 解码失败：{}", e)))?;

    Ok((media_type.to_string(), Bytes::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClipboard {
        files: Vec<ClipboardItem>,
        url: Option<String>,
    }

    impl ClipboardAccess for FakeClipboard {
        fn read_files(&mut self) -> Result<Vec<ClipboardItem>, ImportError> {
            Ok(self.files.clone())
        }

        fn read_url(&mut self) -> Result<Option<String>, ImportError> {
            Ok(self.url.clone())
        }
    }

    struct DeniedTrigger;

    impl PasteTrigger for DeniedTrigger {
        fn send_paste(&mut self) -> Result<(), ImportError> {
            Err(ImportError::PasteBlocked("denied".to_string()))
        }
    }

    fn text(value: &str) -> ClipboardItem {
        ClipboardItem::Text {
            media_type: "text/plain".to_string(),
            text: value.to_string(),
        }
    }

    fn png_item() -> ClipboardItem {
        ClipboardItem::File {
            media_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn event_data_prefers_files() {
        let mut strategy = EventDataStrategy::new();
        let event = PasteEvent::EventData {
            files: vec![png_item()],
            items: vec![text("hello"), png_item()],
        };

        let contents = strategy.extract(&event).expect("extract");

        assert_eq!(contents, ClipboardContents::Items(vec![png_item()]));
    }

    #[test]
    fn event_data_skips_text_items() {
        let mut strategy = EventDataStrategy::new();
        let event = PasteEvent::EventData {
            files: Vec::new(),
            items: vec![text("hello")],
        };

        assert_eq!(strategy.extract(&event).expect("extract"), ClipboardContents::Nothing);
    }

    #[test]
    fn event_data_trigger_reports_blocked() {
        let mut strategy = EventDataStrategy::new();

        assert!(matches!(strategy.trigger(), Err(ImportError::PasteBlocked(_))));
    }

    #[test]
    fn focus_target_falls_back_to_url() {
        let mut strategy = FocusTargetStrategy::new(
            Box::new(FakeClipboard {
                files: Vec::new(),
                url: Some("https://example.com/cat.png".to_string()),
            }),
            Box::new(DeniedTrigger),
        );

        let contents = strategy.extract(&PasteEvent::FocusTarget).expect("extract");

        assert_eq!(contents, ClipboardContents::Url("https://example.com/cat.png".to_string()));
    }

    #[test]
    fn focus_target_trigger_failure_is_reported() {
        let mut strategy = FocusTargetStrategy::new(
            Box::new(FakeClipboard { files: Vec::new(), url: None }),
            Box::new(DeniedTrigger),
        );

        assert_eq!(
            strategy.trigger(),
            Err(ImportError::PasteBlocked("denied".to_string()))
        );
    }

    #[test]
    fn inline_data_url_is_parsed() {
        let (media_type, bytes) =
            parse_inline_image_url("data:image/png;base64,iVBORw0KGgo=", 1024).expect("parse");

        assert_eq!(media_type, "image/png");
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn remote_url_is_never_fetched() {
        let result = parse_inline_image_url("https://example.com/cat.png", 1024);

        assert!(matches!(result, Err(ImportError::ClipboardUnavailable(_))));
    }

    #[test]
    fn inline_data_url_rejects_non_image() {
        let result = parse_inline_image_url("data:text/plain;base64,aGVsbG8=", 1024);

        assert!(matches!(result, Err(ImportError::NotAnImage(_))));
    }

    #[test]
    fn inline_data_url_respects_size_limit() {
        let payload = format!("data:image/png;base64,{}", "A".repeat(4096));
        let result = parse_inline_image_url(&payload, 32);

        assert!(matches!(result, Err(ImportError::ResourceLimit(_))));
    }
}
