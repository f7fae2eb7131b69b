//! # 暂存区状态机
//!
//! ## 设计思路
//!
//! 暂存区在“导入”和“放置”之间暂存一张图片：
//!
//! ```text
//!            Decoded                EnterCrop
//!   Empty ───────────────▶ Staged ────────────▶ Cropping
//!     ▲                     │  ▲   ConfirmCrop /   │
//!     │       HandOff       │  └──── CancelCrop ───┘
//!     └─────────────────────┴──────────────────────┘
//! ```
//!
//! - 任意 `(状态, 事件)` 组合都有确定的下一状态；不适用的组合是显式的 `Ignored` 空转移。
//! - 同一时间最多暂存一张图；新图片到达时替换旧图，并丢弃进行中的裁剪。
//! - 被拒绝的内容不会触碰已暂存的图片。
//!
//! ## 实现思路
//!
//! - 异步解码开始前签发 `DecodeTicket`（单调递增的代号），完成时只有“最新”的票据才能写入状态，
//!   先发起但后完成的解码会被丢弃，避免旧图覆盖新图。
//! - 抓取偏移（`PendingOffset`）只在拖出开始到匹配的放置之间存在。
//! - 状态由数据推导（有无图片、裁剪是否激活），不单独存储，避免不一致。

use serde::Serialize;

use crate::config::ImportConfig;
use crate::crop::{CropSelection, CropStage};
use crate::decoder::ImageHandle;
use crate::error::{ImportError, ImportNotice};
use crate::geometry::Offset;

/// 拖出开始时记录的抓取点（相对图片左上角）。
pub type PendingOffset = Offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DropzoneState {
    /// 显示占位提示，没有图片。
    Empty,
    /// 有图片，可拖出，可进入裁剪。
    Staged,
    /// 裁剪选区占据图片，拖出与再次裁剪被禁用。
    Cropping,
}

/// 解码票据。
///
/// 只能由 `Dropzone::begin_decode` 签发。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    generation: u64,
}

/// 暂存区输入事件。
#[derive(Debug, Clone)]
pub enum DropzoneEvent {
    /// 拖放或粘贴的图片解码完成。
    Decoded {
        ticket: DecodeTicket,
        image: ImageHandle,
    },
    /// 拖入的内容被拒绝（非图片、解码失败等）。
    Rejected(ImportError),
    /// 点击裁剪入口。
    EnterCrop,
    /// 用户拖拽调整选区。
    AdjustCrop(CropSelection),
    ConfirmCrop,
    CancelCrop,
    /// 开始把图片拖出暂存区，`grab` 为抓取点相对图片左上角的偏移。
    DragStarted { grab: Offset },
    /// 拖出手势结束（无论是否落到目标上）。
    DragEnded,
    /// 图片已放置到目标上。
    HandOff,
    /// 有内容拖入暂存区上方。
    DragEnter,
    DragLeave,
}

/// 一次转移产生的副作用，供宿主刷新 UI。
#[derive(Debug, Clone)]
pub enum Effect {
    Staged {
        image: ImageHandle,
        replaced: Option<ImageHandle>,
    },
    Rejected(ImportNotice),
    /// 过期的解码结果被丢弃。
    StaleDiscarded {
        image: ImageHandle,
    },
    CropStarted(CropSelection),
    CropAdjusted(CropSelection),
    CropConfirmed {
        image: ImageHandle,
    },
    CropCancelled,
    OffsetCaptured(PendingOffset),
    OffsetCleared,
    HandedOff {
        image: ImageHandle,
        grab: Option<PendingOffset>,
    },
    HoverChanged(bool),
    /// 当前状态下该事件不适用，状态不变。
    Ignored(&'static str),
}

/// 状态转移结果。
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: DropzoneState,
    pub to: DropzoneState,
    pub effect: Effect,
}

/// 宿主渲染用的暂存区快照。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropzoneView {
    pub state: DropzoneState,
    pub image_id: Option<u64>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub crop_control_visible: bool,
    pub drag_enabled: bool,
    pub hovered: bool,
    pub selection: Option<CropSelection>,
    pub has_pending_offset: bool,
}

/// 暂存区。
///
/// 每个导入界面显式构造一个实例，不使用全局单例。
pub struct Dropzone {
    staged: Option<ImageHandle>,
    crop: CropStage,
    pending_offset: Option<PendingOffset>,
    generation: u64,
    cropping_enabled: bool,
    clear_offset_on_drag_end: bool,
    hovered: bool,
}

impl Dropzone {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            staged: None,
            crop: CropStage::new(),
            pending_offset: None,
            generation: 0,
            cropping_enabled: config.enable_cropping,
            clear_offset_on_drag_end: config.clear_offset_on_drag_end,
            hovered: false,
        }
    }

    pub fn state(&self) -> DropzoneState {
        match (&self.staged, self.crop.is_active()) {
            (None, _) => DropzoneState::Empty,
            (Some(_), true) => DropzoneState::Cropping,
            (Some(_), false) => DropzoneState::Staged,
        }
    }

    pub fn staged_image(&self) -> Option<&ImageHandle> {
        self.staged.as_ref()
    }

    pub fn pending_offset(&self) -> Option<PendingOffset> {
        self.pending_offset
    }

    pub fn crop_selection(&self) -> Option<CropSelection> {
        self.crop.selection()
    }

    /// 为一次即将开始的解码签发票据，之前签发的票据随即过期。
    pub fn begin_decode(&mut self) -> DecodeTicket {
        self.generation += 1;
        DecodeTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: DecodeTicket) -> bool {
        ticket.generation == self.generation
    }

    /// 直接暂存一张已解码的图片（粘贴等同步来源）。
    pub fn set_staged_image(&mut self, image: ImageHandle) -> Transition {
        let ticket = self.begin_decode();
        self.apply(DropzoneEvent::Decoded { ticket, image })
    }

    /// 状态机入口：对任意事件给出确定的转移。
    pub fn apply(&mut self, event: DropzoneEvent) -> Transition {
        let from = self.state();
        let effect = self.transition(from, event);
        let to = self.state();

        match &effect {
            Effect::Ignored(reason) => {
                log::debug!("⏭️ 暂存区事件被忽略 - 状态: {:?} 原因: {}", from, reason)
            }
            other => log::debug!("🔁 暂存区 {:?} -> {:?}: {:?}", from, to, other),
        }

        Transition { from, to, effect }
    }

    fn transition(&mut self, from: DropzoneState, event: DropzoneEvent) -> Effect {
        use DropzoneState::{Cropping, Empty, Staged};

        match (from, event) {
            (_, DropzoneEvent::Decoded { ticket, image }) => {
                self.hovered = false;
                if !self.is_current(ticket) {
                    log::info!("🗑️ 丢弃过期的解码结果 - image={}", image.id());
                    return Effect::StaleDiscarded { image };
                }
                self.crop.destroy();
                self.pending_offset = None;
                let replaced = self.staged.replace(image.clone());
                log::info!(
                    "📥 图片已暂存 - image={} 尺寸: {}x{} 替换: {}",
                    image.id(),
                    image.width(),
                    image.height(),
                    replaced.is_some()
                );
                Effect::Staged { image, replaced }
            }
            (_, DropzoneEvent::Rejected(error)) => {
                self.hovered = false;
                log::warn!("🚫 暂存区拒绝了拖入内容: {}", error);
                Effect::Rejected(ImportNotice::from(&error))
            }

            (Staged, DropzoneEvent::EnterCrop) => match (&self.staged, self.cropping_enabled) {
                (Some(image), true) => Effect::CropStarted(self.crop.enter(image)),
                _ => Effect::Ignored("裁剪功能未启用"),
            },
            (Empty, DropzoneEvent::EnterCrop) => Effect::Ignored("没有可裁剪的图片"),
            (Cropping, DropzoneEvent::EnterCrop) => Effect::Ignored("已在裁剪中"),

            (Cropping, DropzoneEvent::AdjustCrop(selection)) => match self.crop.adjust(selection) {
                Some(clamped) => Effect::CropAdjusted(clamped),
                None => Effect::Ignored("裁剪会话不存在"),
            },
            (Empty | Staged, DropzoneEvent::AdjustCrop(_)) => Effect::Ignored("未在裁剪中"),

            (Cropping, DropzoneEvent::ConfirmCrop) => match self.crop.confirm() {
                Some(image) => {
                    self.staged = Some(image.clone());
                    self.pending_offset = None;
                    Effect::CropConfirmed { image }
                }
                None => Effect::Ignored("裁剪会话不存在"),
            },
            (Empty | Staged, DropzoneEvent::ConfirmCrop) => Effect::Ignored("未在裁剪中"),

            (Cropping, DropzoneEvent::CancelCrop) => {
                self.crop.cancel();
                Effect::CropCancelled
            }
            (Empty | Staged, DropzoneEvent::CancelCrop) => Effect::Ignored("未在裁剪中"),

            (Staged, DropzoneEvent::DragStarted { grab }) => {
                self.pending_offset = Some(grab);
                Effect::OffsetCaptured(grab)
            }
            (Empty, DropzoneEvent::DragStarted { .. }) => Effect::Ignored("没有可拖出的图片"),
            (Cropping, DropzoneEvent::DragStarted { .. }) => Effect::Ignored("裁剪中不可拖出"),

            (_, DropzoneEvent::DragEnded) => {
                if self.clear_offset_on_drag_end && self.pending_offset.take().is_some() {
                    log::debug!("🧹 拖出未落到目标上，清除抓取偏移");
                    Effect::OffsetCleared
                } else {
                    Effect::Ignored("没有待清除的抓取偏移")
                }
            }

            (Staged | Cropping, DropzoneEvent::HandOff) => {
                self.crop.destroy();
                self.hovered = false;
                let grab = self.pending_offset.take();
                match self.staged.take() {
                    Some(image) => Effect::HandedOff { image, grab },
                    None => Effect::Ignored("没有暂存的图片"),
                }
            }
            (Empty, DropzoneEvent::HandOff) => {
                self.pending_offset = None;
                Effect::Ignored("没有暂存的图片")
            }

            (_, DropzoneEvent::DragEnter) => {
                self.hovered = true;
                Effect::HoverChanged(true)
            }
            (_, DropzoneEvent::DragLeave) => {
                self.hovered = false;
                Effect::HoverChanged(false)
            }
        }
    }

    /// 当前快照，供宿主渲染占位提示 / 图片 / 裁剪入口。
    pub fn view(&self) -> DropzoneView {
        let state = self.state();
        DropzoneView {
            state,
            image_id: self.staged.as_ref().map(ImageHandle::id),
            image_width: self.staged.as_ref().map(ImageHandle::width),
            image_height: self.staged.as_ref().map(ImageHandle::height),
            crop_control_visible: self.cropping_enabled && state == DropzoneState::Staged,
            drag_enabled: state == DropzoneState::Staged,
            hovered: self.hovered,
            selection: self.crop.selection(),
            has_pending_offset: self.pending_offset.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::test_support::handle;

    fn staged_dropzone(width: u32, height: u32) -> (Dropzone, ImageHandle) {
        let mut dropzone = Dropzone::new(&ImportConfig::default());
        let image = handle(width, height);
        dropzone.set_staged_image(image.clone());
        (dropzone, image)
    }

    fn cropping_dropzone() -> Dropzone {
        let (mut dropzone, _) = staged_dropzone(40, 30);
        dropzone.apply(DropzoneEvent::EnterCrop);
        dropzone
    }

    fn dropzone_in(state: DropzoneState) -> Dropzone {
        match state {
            DropzoneState::Empty => Dropzone::new(&ImportConfig::default()),
            DropzoneState::Staged => staged_dropzone(40, 30).0,
            DropzoneState::Cropping => cropping_dropzone(),
        }
    }

    fn events(dropzone: &mut Dropzone) -> Vec<(&'static str, DropzoneEvent)> {
        let ticket = dropzone.begin_decode();
        vec![
            ("decoded", DropzoneEvent::Decoded { ticket, image: handle(8, 8) }),
            ("rejected", DropzoneEvent::Rejected(ImportError::NotAnImage("text/plain".into()))),
            ("enter_crop", DropzoneEvent::EnterCrop),
            ("adjust_crop", DropzoneEvent::AdjustCrop(CropSelection::new(1, 1, 5, 5))),
            ("confirm_crop", DropzoneEvent::ConfirmCrop),
            ("cancel_crop", DropzoneEvent::CancelCrop),
            ("drag_started", DropzoneEvent::DragStarted { grab: Offset::new(3.0, 4.0) }),
            ("drag_ended", DropzoneEvent::DragEnded),
            ("hand_off", DropzoneEvent::HandOff),
            ("drag_enter", DropzoneEvent::DragEnter),
            ("drag_leave", DropzoneEvent::DragLeave),
        ]
    }

    fn expected_next(from: DropzoneState, event: &str) -> DropzoneState {
        use DropzoneState::*;
        match (from, event) {
            (_, "decoded") => Staged,
            (Staged, "enter_crop") => Cropping,
            (Cropping, "confirm_crop") | (Cropping, "cancel_crop") => Staged,
            (Staged | Cropping, "hand_off") => Empty,
            (state, _) => state,
        }
    }

    #[test]
    fn transition_table_is_total() {
        let states = [
            DropzoneState::Empty,
            DropzoneState::Staged,
            DropzoneState::Cropping,
        ];

        for from in states {
            let event_count = events(&mut dropzone_in(from)).len();
            for index in 0..event_count {
                let mut dropzone = dropzone_in(from);
                let (name, event) = events(&mut dropzone).swap_remove(index);

                let transition = dropzone.apply(event);

                assert_eq!(transition.from, from, "{name}");
                assert_eq!(transition.to, dropzone.state(), "{name}");
                assert_eq!(transition.to, expected_next(from, name), "{from:?} + {name}");
            }
        }
    }

    #[test]
    fn rejection_leaves_staged_image_untouched() {
        let (mut dropzone, image) = staged_dropzone(20, 20);

        let transition =
            dropzone.apply(DropzoneEvent::Rejected(ImportError::NotAnImage("text/plain".into())));

        assert!(matches!(transition.effect, Effect::Rejected(ref notice) if notice.code == "not_an_image"));
        assert_eq!(dropzone.state(), DropzoneState::Staged);
        assert_eq!(dropzone.staged_image(), Some(&image));
    }

    #[test]
    fn second_image_while_cropping_discards_crop() {
        let mut dropzone = cropping_dropzone();
        dropzone.apply(DropzoneEvent::AdjustCrop(CropSelection::new(1, 1, 5, 5)));
        let next = handle(60, 70);

        let transition = dropzone.set_staged_image(next.clone());

        assert_eq!(transition.to, DropzoneState::Staged);
        assert!(matches!(transition.effect, Effect::Staged { replaced: Some(_), .. }));
        assert_eq!(dropzone.staged_image(), Some(&next));
        assert_eq!(dropzone.crop_selection(), None);
    }

    #[test]
    fn stale_ticket_cannot_overwrite_newer_image() {
        let mut dropzone = Dropzone::new(&ImportConfig::default());
        let first = dropzone.begin_decode();
        let second = dropzone.begin_decode();
        let image_two = handle(2, 2);

        dropzone.apply(DropzoneEvent::Decoded { ticket: second, image: image_two.clone() });
        let transition = dropzone.apply(DropzoneEvent::Decoded { ticket: first, image: handle(1, 1) });

        assert!(matches!(transition.effect, Effect::StaleDiscarded { .. }));
        assert_eq!(dropzone.staged_image(), Some(&image_two));
    }

    #[test]
    fn drag_off_captures_and_hand_off_consumes_offset() {
        let (mut dropzone, image) = staged_dropzone(20, 20);
        dropzone.apply(DropzoneEvent::DragStarted { grab: Offset::new(5.0, 6.0) });
        assert_eq!(dropzone.pending_offset(), Some(Offset::new(5.0, 6.0)));

        let transition = dropzone.apply(DropzoneEvent::HandOff);

        match transition.effect {
            Effect::HandedOff { image: handed, grab } => {
                assert_eq!(handed, image);
                assert_eq!(grab, Some(Offset::new(5.0, 6.0)));
            }
            other => panic!("unexpected effect: {other:?}"),
        }
        assert_eq!(dropzone.state(), DropzoneState::Empty);
        assert_eq!(dropzone.pending_offset(), None);
    }

    #[test]
    fn drag_end_clears_unmatched_offset() {
        let (mut dropzone, _) = staged_dropzone(20, 20);
        dropzone.apply(DropzoneEvent::DragStarted { grab: Offset::new(1.0, 1.0) });

        let transition = dropzone.apply(DropzoneEvent::DragEnded);

        assert!(matches!(transition.effect, Effect::OffsetCleared));
        assert_eq!(dropzone.pending_offset(), None);
        assert_eq!(dropzone.state(), DropzoneState::Staged);
    }

    #[test]
    fn drag_end_keeps_offset_when_configured() {
        let config = ImportConfig {
            clear_offset_on_drag_end: false,
            ..ImportConfig::default()
        };
        let mut dropzone = Dropzone::new(&config);
        dropzone.set_staged_image(handle(4, 4));
        dropzone.apply(DropzoneEvent::DragStarted { grab: Offset::new(1.0, 2.0) });

        dropzone.apply(DropzoneEvent::DragEnded);

        assert_eq!(dropzone.pending_offset(), Some(Offset::new(1.0, 2.0)));
    }

    #[test]
    fn cropping_disabled_hides_control_and_ignores_entry() {
        let config = ImportConfig {
            enable_cropping: false,
            ..ImportConfig::default()
        };
        let mut dropzone = Dropzone::new(&config);
        dropzone.set_staged_image(handle(4, 4));

        let transition = dropzone.apply(DropzoneEvent::EnterCrop);

        assert!(matches!(transition.effect, Effect::Ignored(_)));
        assert!(!dropzone.view().crop_control_visible);
    }

    #[test]
    fn view_reflects_cropping_state() {
        let dropzone = cropping_dropzone();
        let view = dropzone.view();

        assert_eq!(view.state, DropzoneState::Cropping);
        assert!(!view.drag_enabled);
        assert!(!view.crop_control_visible);
        assert_eq!(view.selection, Some(CropSelection::full(40, 30)));
        assert_eq!(view.image_width, Some(40));
    }

    #[test]
    fn confirm_crop_replaces_staged_image() {
        let mut dropzone = Dropzone::new(&ImportConfig::default());
        dropzone.set_staged_image(handle(200, 150));
        dropzone.apply(DropzoneEvent::EnterCrop);
        dropzone.apply(DropzoneEvent::AdjustCrop(CropSelection::new(10, 10, 100, 80)));

        let transition = dropzone.apply(DropzoneEvent::ConfirmCrop);

        assert_eq!(transition.to, DropzoneState::Staged);
        let staged = dropzone.staged_image().expect("image staged");
        assert_eq!(staged.dimensions(), (100, 80));
        assert_eq!(dropzone.crop_selection(), None);
    }
}
