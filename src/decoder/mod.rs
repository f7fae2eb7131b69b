//! # 图片解码模块（decoder）
//!
//! ## 设计思路
//!
//! 把拖放文件、剪贴板文件项、剪贴板位图统一解码为尺寸已知的 `ImageHandle`。
//! 在“尽可能早”的阶段执行输入校验：声明类型不是图片时立即拒绝，不启动任何异步读取。
//!
//! - `source`：外部来源与中间数据模型
//! - `pipeline`：尺寸探测、资源上限、完整解码
//! - `handle`：不可变的图像句柄
//!
//! ## 实现思路
//!
//! ```text
//! decode(source)
//!    ├─ check_media_type（同步，失败即 NotAnImage）
//!    ├─ read_bytes（tokio::fs 异步读取 + 体积上限）
//!    └─ spawn_blocking(pipeline::decode_raw)（header 探测 + 完整解码）
//! ```
//!
//! 两个挂起点都完成之后才返回句柄，不会暴露“半成品”。
//! 两次并发解码的完成顺序没有保证，调用方需要用 `DecodeTicket` 判断结果是否过期。

mod handle;
mod pipeline;
mod source;

use std::time::Instant;

use bytes::Bytes;

pub use handle::ImageHandle;
pub use source::{ImageSource, is_image_media_type};

use crate::config::ImportConfig;
use crate::error::ImportError;
use source::{RawImageData, RawPayload};

/// 解码阶段的资源上限（`ImportConfig` 的子集）。
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_file_size: u64,
    pub max_decoded_pixels: u64,
    pub max_decoded_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for DecodeLimits {
    fn from(config: &ImportConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
        }
    }
}

/// 图片解码器。
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder {
    limits: DecodeLimits,
}

impl ImageDecoder {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// 同步检查声明的媒体类型。
    ///
    /// 调用方可以先做这一步，再决定是否签发解码票据。
    pub fn check_media_type(&self, source: &ImageSource) -> Result<(), ImportError> {
        match source.declared_media_type() {
            None => Ok(()),
            Some(media_type) if is_image_media_type(media_type) => Ok(()),
            Some(media_type) => {
                log::debug!("🚫 声明类型不是图片，拒绝解码: {:?}", media_type);
                Err(ImportError::NotAnImage(if media_type.is_empty() {
                    "未声明媒体类型".to_string()
                } else {
                    media_type.to_string()
                }))
            }
        }
    }

    /// 解码主入口。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use sketch_import::{ImageDecoder, ImageSource};
    ///
    /// # async fn demo() -> Result<(), sketch_import::ImportError> {
    /// let decoder = ImageDecoder::default();
    /// let image = decoder
    ///     .decode(ImageSource::file("/tmp/photo.png", "image/png"))
    ///     .await?;
    /// println!("{}x{}", image.width(), image.height());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn decode(&self, source: ImageSource) -> Result<ImageHandle, ImportError> {
        self.check_media_type(&source)?;

        let total_start = Instant::now();
        let raw = self.read_bytes(source).await?;
        let read_elapsed = total_start.elapsed();

        let limits = self.limits;
        let handle = tokio::task::spawn_blocking(move || pipeline::decode_raw(raw, &limits))
            .await
            .map_err(|e| ImportError::DecodeFailed(format!("解码任务异常终止：{}", e)))??;

        log::debug!(
            "⏱️ 解码完成 - id={} read={}ms total={}ms",
            handle.id(),
            read_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(handle)
    }

    async fn read_bytes(&self, source: ImageSource) -> Result<RawImageData, ImportError> {
        let source_hint = source.source_hint();

        let payload = match source {
            ImageSource::File { path, .. } => {
                log::info!("📁 开始读取拖放图片 - 路径: {}", path.display());

                let metadata = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| ImportError::FileSystem(format!("无法读取文件信息：{}", e)))?;
                self.validate_byte_size(metadata.len())?;

                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ImportError::FileSystem(format!("无法读取图片文件：{}", e)))?;
                RawPayload::Encoded(Bytes::from(bytes))
            }
            ImageSource::Blob { bytes, .. } => {
                self.validate_byte_size(bytes.len() as u64)?;
                RawPayload::Encoded(bytes)
            }
            ImageSource::Bitmap { width, height, bytes } => {
                // 位图已是解码后的像素，按解码内存上限计，不按文件体积上限
                self.validate_bitmap_size(bytes.len() as u64)?;
                RawPayload::Rgba { width, height, bytes }
            }
        };

        Ok(RawImageData {
            payload,
            source_hint,
        })
    }

    fn validate_byte_size(&self, len: u64) -> Result<(), ImportError> {
        if len > self.limits.max_file_size {
            return Err(ImportError::ResourceLimit(format!(
                "图片体积过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                self.limits.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn validate_bitmap_size(&self, len: u64) -> Result<(), ImportError> {
        if len > self.limits.max_decoded_bytes {
            return Err(ImportError::ResourceLimit(format!(
                "位图占用内存过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                self.limits.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }
}
