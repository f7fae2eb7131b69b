//! # 裁剪模块
//!
//! ## 设计思路
//!
//! 裁剪器只服务于暂存区当前的那一张图：进入时选区覆盖整张图，
//! 用户拖拽调整时选区实时更新并收敛到图片范围内，确认后产出新的句柄替换原图。
//! 同一时间最多一个激活的裁剪会话，重复进入会先销毁旧会话。
//!
//! ## 实现思路
//!
//! - 原图句柄不可变，确认时用 `imageops::crop_imm` 复制选区像素，生成新的 `ImageHandle`。
//! - `destroy` 可在任意时刻调用（幂等）。

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::decoder::ImageHandle;

/// 图片自身像素坐标系下的裁剪选区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSelection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropSelection {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 覆盖整张图片的选区。
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// 将选区收敛到 `width x height` 的图片内，最小 1x1。
    ///
    /// # 后置条件
    /// - `x + width <= image_width`
    /// - `y + height <= image_height`
    pub fn clamped_to(self, image_width: u32, image_height: u32) -> Self {
        let image_width = image_width.max(1);
        let image_height = image_height.max(1);

        let x = self.x.min(image_width - 1);
        let y = self.y.min(image_height - 1);
        let width = self.width.clamp(1, image_width - x);
        let height = self.height.clamp(1, image_height - y);

        Self::new(x, y, width, height)
    }
}

/// 激活中的裁剪会话。
struct ActiveCrop {
    image: ImageHandle,
    selection: CropSelection,
}

/// 裁剪器：`Inactive` 或 `Active(CropSelection)`。
#[derive(Default)]
pub struct CropStage {
    active: Option<ActiveCrop>,
}

impl CropStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// 当前选区；未激活时为 `None`。
    pub fn selection(&self) -> Option<CropSelection> {
        self.active.as_ref().map(|crop| crop.selection)
    }

    /// 对指定图片开启裁剪，选区初始化为整张图。
    pub fn enter(&mut self, image: &ImageHandle) -> CropSelection {
        if self.is_active() {
            self.destroy();
        }

        let selection = CropSelection::full(image.width(), image.height());
        self.active = Some(ActiveCrop {
            image: image.clone(),
            selection,
        });

        log::debug!(
            "✂️ 开始裁剪 - image={} 选区: {}x{}",
            image.id(),
            selection.width,
            selection.height
        );
        selection
    }

    /// 用户调整选区；返回收敛后的选区，未激活时返回 `None`。
    pub fn adjust(&mut self, selection: CropSelection) -> Option<CropSelection> {
        let crop = self.active.as_mut()?;
        crop.selection = selection.clamped_to(crop.image.width(), crop.image.height());
        Some(crop.selection)
    }

    /// 按当前选区裁出新图片并结束会话。
    ///
    /// 原句柄不受影响；未激活时返回 `None`。
    pub fn confirm(&mut self) -> Option<ImageHandle> {
        let crop = self.active.take()?;
        let CropSelection {
            x,
            y,
            width,
            height,
        } = crop.selection;

        let cropped = imageops::crop_imm(crop.image.pixels(), x, y, width, height).to_image();
        let handle = ImageHandle::from_rgba(cropped, "crop");

        log::info!(
            "✂️ 裁剪完成 - {}x{} -> {}x{} (offset {},{})",
            crop.image.width(),
            crop.image.height(),
            handle.width(),
            handle.height(),
            x,
            y
        );
        Some(handle)
    }

    /// 放弃当前选区；返回是否确实取消了一个会话。
    pub fn cancel(&mut self) -> bool {
        let was_active = self.active.take().is_some();
        if was_active {
            log::debug!("↩️ 已取消裁剪");
        }
        was_active
    }

    /// 销毁裁剪会话，任意状态下都可以安全调用。
    pub fn destroy(&mut self) {
        self.active = None;
    }
}
