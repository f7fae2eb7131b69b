//! # 图片导入协调核心 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 宿主（绘图应用 / CLI）                    │
//! │                                                          │
//! │  拖放事件 ── 粘贴事件 ── 指针坐标 ── DrawingSurface       │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError> / PlacementEvent
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                核心 (Rust)                        │
//! │                                                          │
//! │  ┌─ coordinator ── 三条导入通道汇聚 + 放置坐标修正        │
//! │  │   ├─ dropzone      暂存区状态机 (Empty/Staged/Cropping)│
//! │  │   │   └─ crop      选区裁剪，产出新句柄                │
//! │  │   ├─ clipboard     两种粘贴策略 + 系统剪贴板           │
//! │  │   └─ decoder       异步解码 + 资源上限                 │
//! │  ├─ geometry ──── 指针 → 元素内偏移                      │
//! │  ├─ config ────── ImportConfig (开关 + 上限)              │
//! │  └─ error ─────── ImportError / AppError                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 流水线错误 `ImportError`、边界错误 `AppError`、UI 提示 `ImportNotice` |
//! | [`config`] | 导入配置、设置 JSON 覆盖与校验 |
//! | [`geometry`] | 视口坐标到元素内偏移的纯函数换算 |
//! | [`decoder`] | 文件 / Blob / 剪贴板位图解码为 `ImageHandle` |
//! | [`crop`] | 裁剪会话与选区收敛 |
//! | [`dropzone`] | 暂存区状态机、解码票据、抓取偏移 |
//! | [`clipboard`] | 粘贴投递策略、arboard 剪贴板、enigo 粘贴触发 |
//! | [`coordinator`] | 拖放 / 粘贴 / 拖出的汇聚与放置事件 |

pub mod error;
pub mod config;
pub mod geometry;
pub mod decoder;
pub mod crop;
pub mod dropzone;
pub mod clipboard;
pub mod coordinator;

pub use clipboard::{ClipboardBridge, ClipboardItem, PasteEvent, PasteMode, PasteResult};
pub use config::ImportConfig;
pub use coordinator::{
    DragOverResponse, DragRegion, DrawingSurface, DropPayload, ImportCoordinator, IngestOutcome,
    PasteOutcome, PlacementEvent, SurfaceCommand, TargetDropOutcome,
};
pub use crop::{CropSelection, CropStage};
pub use decoder::{DecodeLimits, ImageDecoder, ImageHandle, ImageSource};
pub use dropzone::{Dropzone, DropzoneEvent, DropzoneState, DropzoneView, Effect, Transition};
pub use error::{AppError, ImportError, ImportNotice};
pub use geometry::{ElementRect, Offset, PointerPosition, offset_within};
