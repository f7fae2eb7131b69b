//! 坐标偏移计算模块
//!
//! 把“视口坐标系下的指针位置”换算成“相对某个元素左上角”的偏移。
//! 抓取暂存图片时算一次（抓在图片的哪里），落到目标上时再算一次（落在目标的哪里），
//! 两者相减就是图片左上角应该放置的位置。
//!
//! # 设计思路
//!
//! - 纯函数，无状态，便于测试。
//! - 指针与元素矩形都取视口坐标，因此页面滚动时结果不变。

use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// 视口坐标系下的指针位置（对应事件的 client 坐标）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerPosition {
    pub fn new(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y }
    }
}

/// 元素在视口中的包围矩形。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// 相对某个元素左上角的偏移。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// 计算指针相对元素左上角的偏移。
///
/// # 参数
/// * `pointer`   - 视口坐标系下的指针位置
/// * `reference` - 参照元素在视口中的矩形
///
/// # 后置条件
/// - 指针恰好位于元素左上角时返回 `(0, 0)`
/// - 对指针与元素同时平移（滚动）结果不变
pub fn offset_within(pointer: PointerPosition, reference: &ElementRect) -> Offset {
    Offset::new(
        pointer.client_x - reference.left,
        pointer.client_y - reference.top,
    )
}
