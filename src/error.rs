//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 导入链路中的每一种失败都是“局部可恢复”的：最坏结果是“什么都没发生，并提示用户”。
//! 因此这里不区分致命/非致命，只按来源划分分支，让宿主 UI 可以按 `code()` 渲染提示。
//!
//! # 实现思路
//!
//! - `ImportError`：解码 / 剪贴板 / 粘贴触发等流水线错误，使用 `thiserror` 派生可读消息。
//! - `AppError`：crate 边界（CLI、宿主集成）统一错误，`#[from]` 自动上转。
//! - `ImportNotice`：给宿主 UI 的结构化提示，实现 `Serialize`。

use serde::Serialize;

/// 图片导入流水线错误。
///
/// 所有分支都可恢复：被拒绝的解码不会改变暂存区状态。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// 声明的媒体类型不是 `image/*`。
    #[error("不是图片：{0}")]
    NotAnImage(String),

    /// 字节存在但无法得到可用图像（数据损坏、格式不支持等）。
    #[error("解码错误：{0}")]
    DecodeFailed(String),

    /// 剪贴板中没有受支持的数据。
    #[error("剪贴板无可用图片：{0}")]
    ClipboardUnavailable(String),

    /// 宿主权限策略拒绝了程序化粘贴。
    #[error("粘贴被阻止：{0}")]
    PasteBlocked(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("文件错误：{0}")]
    FileSystem(String),
}

impl ImportError {
    /// 稳定的错误码，供宿主选择提示文案。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnImage(_) => "not_an_image",
            Self::DecodeFailed(_) => "decode_failed",
            Self::ClipboardUnavailable(_) => "clipboard_unavailable",
            Self::PasteBlocked(_) => "paste_blocked",
            Self::ResourceLimit(_) => "resource_limit",
            Self::FileSystem(_) => "file_system",
        }
    }
}

/// 传给宿主 UI 的提示。
///
/// 具体措辞属于展示层，这里只保证不同结果可区分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportNotice {
    pub code: &'static str,
    pub message: String,
}

impl From<&ImportError> for ImportNotice {
    fn from(error: &ImportError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 导入流水线错误（解码 / 剪贴板 / 粘贴）
    #[error("{0}")]
    Import(#[from] ImportError),

    /// 配置无效
    #[error("配置错误: {0}")]
    Config(String),

    /// 暂存区状态锁不可用
    #[error("状态锁已中毒: {0}")]
    State(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 将错误序列化为人类可读的字符串，方便宿主跨进程透传。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
