//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImportConfig`：暂存区/裁剪开关、粘贴行为、以及解码阶段的资源上限。
//! `Default` 提供生产可用的配置，宿主可以再用设置 JSON 覆盖其中的部分字段。
//!
//! ## 实现思路
//!
//! - `apply_settings` 读取 camelCase 键，缺失的键保持原值。
//! - `validate` 在应用配置前拒绝明显不合理的上限组合。

use crate::error::AppError;

/// 导入流水线配置。
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// 是否启用暂存区；关闭后文件只能直接拖到目标上。
    pub enable_dropzone: bool,
    /// 暂存图片后是否提供裁剪入口。
    pub enable_cropping: bool,
    /// 粘贴时是否阻止平台默认处理（只截获数据）。
    pub prevent_default_paste: bool,
    /// 拖出手势结束但没有落到目标上时，是否清除抓取偏移。
    pub clear_offset_on_drag_end: bool,
    /// 是否接受剪贴板文本中的内联 `data:image/...;base64,` 地址。
    ///
    /// 远程 URL 无论如何都不会被拉取。
    pub allow_inline_data_urls: bool,
    /// 读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            enable_dropzone: true,
            enable_cropping: true,
            prevent_default_paste: true,
            clear_offset_on_drag_end: true,
            allow_inline_data_urls: false,
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
        }
    }
}

impl ImportConfig {
    /// 从宿主设置 JSON 覆盖配置。
    ///
    /// # 示例
    /// ```rust
    /// use sketch_import::ImportConfig;
    ///
    /// let mut config = ImportConfig::default();
    /// config.apply_settings(&serde_json::json!({ "enableCropping": false }))?;
    /// assert!(!config.enable_cropping);
    /// # Ok::<(), sketch_import::AppError>(())
    /// ```
    pub fn apply_settings(&mut self, settings: &serde_json::Value) -> Result<(), AppError> {
        let flag = |key: &str, current: bool| -> bool {
            settings.get(key).and_then(|v| v.as_bool()).unwrap_or(current)
        };
        let limit = |key: &str, current: u64| -> u64 {
            settings.get(key).and_then(|v| v.as_u64()).unwrap_or(current)
        };

        let mut next = self.clone();
        next.enable_dropzone = flag("enableDropzone", next.enable_dropzone);
        next.enable_cropping = flag("enableCropping", next.enable_cropping);
        next.prevent_default_paste = flag("preventDefaultPaste", next.prevent_default_paste);
        next.clear_offset_on_drag_end = flag("clearOffsetOnDragEnd", next.clear_offset_on_drag_end);
        next.allow_inline_data_urls = flag("allowInlineDataUrls", next.allow_inline_data_urls);
        next.max_file_size = limit("maxFileSize", next.max_file_size);
        next.max_decoded_pixels = limit("maxDecodedPixels", next.max_decoded_pixels);
        next.max_decoded_bytes = limit("maxDecodedBytes", next.max_decoded_bytes);

        next.validate()?;
        *self = next;

        log::debug!(
            "⚙️ 导入配置已更新: dropzone={} cropping={} clear_on_drag_end={} data_urls={}",
            self.enable_dropzone,
            self.enable_cropping,
            self.clear_offset_on_drag_end,
            self.allow_inline_data_urls
        );
        Ok(())
    }

    /// 校验资源上限。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_file_size == 0 {
            return Err(AppError::Config("maxFileSize 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(AppError::Config("maxDecodedPixels 必须大于 0".to_string()));
        }
        if self.max_decoded_bytes < 4 {
            return Err(AppError::Config("maxDecodedBytes 至少要容纳一个 RGBA 像素".to_string()));
        }
        Ok(())
    }
}
