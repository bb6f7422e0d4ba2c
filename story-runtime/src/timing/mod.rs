//! # Timing 模块
//!
//! 帧驱动的计时状态机。
//!
//! ## 设计原则
//!
//! - 所有状态机不读真实时钟：宿主每帧推进一次 [`AnimationClock`]，
//!   其余计算一律乘以它的帧间隔，保证速率与帧率无关
//! - 状态显式建模、可序列化
//!
//! ## 子模块
//!
//! - [`RestGate`]：脚本读取的暂停闸门
//! - [`ScreenFade`]：整屏淡入淡出状态机

mod fade;
mod rest;

pub use fade::{FadeEvent, FadePhase, ScreenFade};
pub use rest::RestGate;

use serde::{Deserialize, Serialize};

/// 全局动画时钟
///
/// 进程内唯一的帧间隔标量，由宿主循环每帧推进一次，
/// 以显式引用传给各状态机（不做隐式全局量）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationClock {
    delta: f32,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每帧推进一次
    pub fn advance(&mut self, dt: f32) {
        self.delta = dt.max(0.0);
    }

    /// 当前帧间隔（秒）
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

/// 速率换算表
///
/// 把脚本里作者面向的整数「速度行号」换算为物理速率。
/// 每个动画类别一张表，各自的起始值与步长独立。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTable {
    /// 行号 1 对应的速率
    pub initial: f64,
    /// 相邻行号之间的步长
    pub step: f64,
    /// 行号上限
    pub max_row: i32,
}

impl RateTable {
    pub const fn new(initial: f64, step: f64, max_row: i32) -> Self {
        Self {
            initial,
            step,
            max_row,
        }
    }

    /// 行号 -> 速率
    ///
    /// `value(row) = initial + (clamp(row, 1, max_row) - 1) * step`，
    /// 结果四舍五入到小数点后 4 位。
    pub fn value(&self, row: i32) -> f64 {
        let row = row.clamp(1, self.max_row);
        let raw = self.initial + (row - 1) as f64 * self.step;
        (raw * 10_000.0).round() / 10_000.0
    }
}

/// 精灵不透明度渐变速率（不透明度/秒）
pub const FADE_RATE: RateTable = RateTable::new(60.0, 30.0, 20);
/// 精灵移动速率（像素/秒）
pub const MOVE_RATE: RateTable = RateTable::new(40.0, 40.0, 20);
/// 精灵缩放速率（比例/秒）
pub const SCALE_RATE: RateTable = RateTable::new(0.05, 0.05, 20);
/// 精灵旋转速率（度/秒）
pub const ROTATE_RATE: RateTable = RateTable::new(15.0, 15.0, 20);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let mut clock = AnimationClock::new();
        assert_eq!(clock.delta(), 0.0);

        clock.advance(1.0 / 60.0);
        assert!((clock.delta() - 1.0 / 60.0).abs() < f32::EPSILON);

        // 负间隔视为 0
        clock.advance(-0.5);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_rate_table_value() {
        let table = RateTable::new(40.0, 40.0, 20);
        assert_eq!(table.value(1), 40.0);
        assert_eq!(table.value(2), 80.0);
        assert_eq!(table.value(20), 800.0);
    }

    #[test]
    fn test_rate_table_clamps_row() {
        let table = RateTable::new(40.0, 40.0, 20);
        assert_eq!(table.value(0), table.value(1));
        assert_eq!(table.value(-5), table.value(1));
        assert_eq!(table.value(99), table.value(20));
    }

    #[test]
    fn test_rate_table_rounds_to_4_places() {
        // 0.05 * 3 在二进制下是 0.15000000000000002
        assert_eq!(SCALE_RATE.value(4), 0.2);
        assert_eq!(SCALE_RATE.value(3), 0.15);
        assert_eq!(SCALE_RATE.value(20), 1.0);
    }
}
