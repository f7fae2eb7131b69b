//! # 解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 尺寸探测 → 完整解码 → RGBA 句柄”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先读取 header 尺寸做检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 签名嗅探：声明为图片但内容明显不是图片时直接拒绝
//! 2. 猜测格式并读取 header 尺寸
//! 3. 按像素 / 内存上限快速拒绝
//! 4. 完整解码，并确认解码尺寸与 header 一致
//! 5. 转换 RGBA，包装为 `ImageHandle`
//!
//! 这里的函数都是同步的，由 `ImageDecoder` 放到阻塞线程池执行。

use std::io::Cursor;

use image::{GenericImageView, RgbaImage};

use super::source::{RawImageData, RawPayload};
use super::{DecodeLimits, ImageHandle};
use crate::error::ImportError;

/// 将读取阶段的原始数据解码为图像句柄。
pub(crate) fn decode_raw(raw: RawImageData, limits: &DecodeLimits) -> Result<ImageHandle, ImportError> {
    match raw.payload {
        RawPayload::Encoded(bytes) => decode_encoded(&bytes, raw.source_hint, limits),
        RawPayload::Rgba { width, height, bytes } => {
            wrap_rgba(width, height, bytes.to_vec(), raw.source_hint, limits)
        }
    }
}

fn decode_encoded(
    bytes: &[u8],
    source_hint: &'static str,
    limits: &DecodeLimits,
) -> Result<ImageHandle, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::DecodeFailed("图片内容为空".to_string()));
    }

    validate_image_signature(bytes)?;

    image::guess_format(bytes)
        .map_err(|e| ImportError::DecodeFailed(format!("不支持的图片格式：{}", e)))?;

    let (header_width, header_height) = inspect_dimensions_from_memory(bytes)?;
    validate_pixel_limits(limits, header_width, header_height)?;
    validate_decoded_memory_limits(limits, header_width, header_height)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ImportError::DecodeFailed(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    if (width, height) != (header_width, header_height) {
        return Err(ImportError::DecodeFailed(format!(
            "解码尺寸 {}x{} 与文件头 {}x{} 不一致",
            width, height, header_width, header_height
        )));
    }

    log::info!(
        "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
        source_hint,
        width,
        height
    );

    Ok(ImageHandle::from_rgba(decoded.to_rgba8(), source_hint))
}

fn wrap_rgba(
    width: usize,
    height: usize,
    bytes: Vec<u8>,
    source_hint: &'static str,
    limits: &DecodeLimits,
) -> Result<ImageHandle, ImportError> {
    let width = u32::try_from(width)
        .map_err(|_| ImportError::ResourceLimit(format!("位图宽度超出范围：{}", width)))?;
    let height = u32::try_from(height)
        .map_err(|_| ImportError::ResourceLimit(format!("位图高度超出范围：{}", height)))?;

    if width == 0 || height == 0 {
        return Err(ImportError::DecodeFailed("位图尺寸为零".to_string()));
    }

    validate_pixel_limits(limits, width, height)?;
    validate_decoded_memory_limits(limits, width, height)?;

    let byte_len = bytes.len();
    let pixels = RgbaImage::from_raw(width, height, bytes).ok_or_else(|| {
        ImportError::DecodeFailed(format!(
            "位图像素数据长度异常：{} 字节（{}x{}）",
            byte_len, width, height
        ))
    })?;

    log::info!("✅ 剪贴板位图就绪 - 尺寸: {}x{}", width, height);

    Ok(ImageHandle::from_rgba(pixels, source_hint))
}

/// 用文件签名确认内容是图片。
///
/// 签名无法识别时放行，交给 `guess_format` 决定。
fn validate_image_signature(bytes: &[u8]) -> Result<(), ImportError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImportError::DecodeFailed(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
    }
    Ok(())
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImportError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImportError::DecodeFailed(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ImportError::DecodeFailed(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(limits: &DecodeLimits, width: u32, height: u32) -> Result<(), ImportError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImportError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > limits.max_decoded_pixels {
        return Err(ImportError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, limits.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    limits: &DecodeLimits,
    width: u32,
    height: u32,
) -> Result<(), ImportError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ImportError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > limits.max_decoded_bytes {
        return Err(ImportError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            limits.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}
