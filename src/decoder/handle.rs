//! # 图像句柄
//!
//! 解码完成、尺寸已知的图像引用。句柄不可变，裁剪时替换而不是修改。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

struct ImageInner {
    id: u64,
    pixels: RgbaImage,
    source_hint: &'static str,
}

/// 已解码图像的共享引用。
///
/// 克隆只增加引用计数；`id` 在进程内唯一，用于判断两个句柄是否指向同一张图。
#[derive(Clone)]
pub struct ImageHandle {
    inner: Arc<ImageInner>,
}

impl ImageHandle {
    pub(crate) fn from_rgba(pixels: RgbaImage, source_hint: &'static str) -> Self {
        Self {
            inner: Arc::new(ImageInner {
                id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
                pixels,
                source_hint,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.pixels.dimensions()
    }

    /// RGBA 像素数据（`width * height * 4` 字节）。
    pub fn pixels(&self) -> &RgbaImage {
        &self.inner.pixels
    }

    /// 来源提示（`file` / `blob` / `clipboard` / `crop` 等），用于日志与诊断。
    pub fn source_hint(&self) -> &'static str {
        self.inner.source_hint
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ImageHandle {}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.inner.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("source", &self.inner.source_hint)
            .finish()
    }
}
