//! # 系统剪贴板与粘贴触发
//!
//! ## 设计思路
//!
//! 聚焦目标策略需要两项平台能力：读取剪贴板、模拟一次粘贴。
//! 两者都抽象为 trait，默认实现分别基于 `arboard` 与 `enigo`，测试时可替换为假实现。
//!
//! ## 实现思路
//!
//! - 每次读取都新建 `arboard::Clipboard`，不长期持有平台句柄。
//! - 模拟粘贴发送平台快捷键（macOS 为 Cmd+V，其余为 Ctrl+V）；
//!   输入模拟被系统权限拒绝时上报 `PasteBlocked`，不静默吞掉。
//! - 聚焦后的等待由异步调用方用 `tokio::time::sleep` 完成，这里只发送按键，不阻塞运行时线程。

use std::time::Duration;

use bytes::Bytes;
use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use super::ClipboardItem;
use crate::error::ImportError;

/// 剪贴板读取能力。
pub trait ClipboardAccess: Send {
    /// 读取文件 / 位图类条目；没有时返回空列表。
    fn read_files(&mut self) -> Result<Vec<ClipboardItem>, ImportError>;

    /// 读取 URL / 文本表示。
    fn read_url(&mut self) -> Result<Option<String>, ImportError>;
}

/// 程序化粘贴能力。
pub trait PasteTrigger: Send {
    /// 聚焦隐藏的可编辑目标后，发送按键前需要等待多久。
    fn focus_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// 向已聚焦的目标发送平台粘贴快捷键。
    fn send_paste(&mut self) -> Result<(), ImportError>;
}

/// 基于 `arboard` 的系统剪贴板。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    fn open() -> Result<arboard::Clipboard, ImportError> {
        arboard::Clipboard::new()
            .map_err(|e| ImportError::ClipboardUnavailable(format!("无法打开系统剪贴板：{}", e)))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read_files(&mut self) -> Result<Vec<ClipboardItem>, ImportError> {
        let mut clipboard = Self::open()?;

        match clipboard.get_image() {
            Ok(image) => {
                log::debug!("📋 系统剪贴板包含位图 - 尺寸: {}x{}", image.width, image.height);
                Ok(vec![ClipboardItem::Bitmap {
                    width: image.width,
                    height: image.height,
                    bytes: Bytes::from(image.bytes.into_owned()),
                }])
            }
            Err(arboard::Error::ContentNotAvailable) => Ok(Vec::new()),
            Err(e) => Err(ImportError::ClipboardUnavailable(format!(
                "读取剪贴板图片失败：{}",
                e
            ))),
        }
    }

    fn read_url(&mut self) -> Result<Option<String>, ImportError> {
        let mut clipboard = Self::open()?;

        match clipboard.get_text() {
            Ok(text) => Ok(Some(text.trim().to_string()).filter(|text| !text.is_empty())),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ImportError::ClipboardUnavailable(format!(
                "读取剪贴板文本失败：{}",
                e
            ))),
        }
    }
}

/// 通过模拟按键触发粘贴。
#[derive(Debug, Clone)]
pub struct KeystrokePasteTrigger {
    /// 聚焦后等待多久再发送按键。
    pub focus_delay: Duration,
}

impl Default for KeystrokePasteTrigger {
    fn default() -> Self {
        Self {
            focus_delay: Duration::from_millis(50),
        }
    }
}

impl PasteTrigger for KeystrokePasteTrigger {
    fn focus_delay(&self) -> Duration {
        self.focus_delay
    }

    fn send_paste(&mut self) -> Result<(), ImportError> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| ImportError::PasteBlocked(format!("初始化输入模拟失败: {}", e)))?;

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        enigo
            .key(modifier, Press)
            .and_then(|_| enigo.key(Key::Unicode('v'), Click))
            .and_then(|_| enigo.key(modifier, Release))
            .map_err(|e| ImportError::PasteBlocked(format!("模拟粘贴按键失败: {}", e)))?;

        log::debug!("⌨️ 已模拟粘贴快捷键");
        Ok(())
    }
}
