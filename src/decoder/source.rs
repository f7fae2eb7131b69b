//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示拖放文件、内存 blob、剪贴板位图等外部来源
//! - `RawImageData` 表示已读取但未解码的字节

use std::path::PathBuf;

use bytes::Bytes;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 拖放的本地文件，附带平台声明的媒体类型。
    File { path: PathBuf, media_type: String },
    /// 内存中的原始字节（剪贴板文件项、内联 data URL 等）。
    Blob { bytes: Bytes, media_type: String },
    /// 系统剪贴板给出的、已解码的 RGBA 位图。
    Bitmap {
        width: usize,
        height: usize,
        bytes: Bytes,
    },
}

impl ImageSource {
    pub fn file(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            media_type: media_type.into(),
        }
    }

    pub fn blob(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self::Blob {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// 声明的媒体类型；位图没有声明类型，但必然是图片。
    pub fn declared_media_type(&self) -> Option<&str> {
        match self {
            Self::File { media_type, .. } | Self::Blob { media_type, .. } => Some(media_type),
            Self::Bitmap { .. } => None,
        }
    }

    pub(crate) fn source_hint(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Blob { .. } => "blob",
            Self::Bitmap { .. } => "clipboard-bitmap",
        }
    }
}

/// 判断媒体类型是否为 `image/*`（忽略大小写与参数）。
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(|essence| essence.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// 读取阶段的载荷形态。
pub(crate) enum RawPayload {
    /// 编码后的图片文件字节（PNG / JPEG / ...）。
    Encoded(Bytes),
    /// 已是 RGBA 像素。
    Rgba { width: usize, height: usize, bytes: Bytes },
}

/// 读取阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    pub(crate) payload: RawPayload,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}
