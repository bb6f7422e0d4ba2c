//! # RestGate 模块
//!
//! 脚本读取的暂停闸门：`rest <seconds>` 指令驱动。

use serde::{Deserialize, Serialize};

use super::AnimationClock;

/// 暂停闸门
///
/// 状态只有两个：空闲（`target == 0`）与计时中。
/// 计时中再次 `setup` 是**叠加**而不是重新开始：
/// 未到期时新目标累加到现有目标上。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RestGate {
    accumulated: f32,
    target: f32,
}

impl RestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求暂停 `target` 秒
    ///
    /// 计时中且未到期：目标累加（延长而非重置）；否则从零开始。
    pub fn setup(&mut self, target: f32) {
        if self.pause_required() && self.accumulated < self.target {
            self.target += target;
        } else {
            self.accumulated = 0.0;
            self.target = target;
        }
    }

    /// 每帧推进一次
    ///
    /// 返回是否仍需暂停。到期时复位到空闲并返回 `false`。
    pub fn tick(&mut self, clock: &AnimationClock) -> bool {
        if !self.pause_required() {
            return false;
        }
        if self.accumulated >= self.target {
            self.reset();
            return false;
        }
        self.accumulated += clock.delta();
        true
    }

    /// 是否处于需要暂停的状态（纯读取）
    pub fn pause_required(&self) -> bool {
        self.target > 0.0
    }

    /// 复位到空闲（`rest` 短变体：解除当前暂停）
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.target = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(dt: f32) -> AnimationClock {
        let mut c = AnimationClock::new();
        c.advance(dt);
        c
    }

    #[test]
    fn test_counts_to_target_then_releases() {
        let mut gate = RestGate::new();
        let clock = clock(0.5);

        gate.setup(2.0);
        // 前 4 帧：仍需暂停
        for _ in 0..4 {
            assert!(gate.tick(&clock));
        }
        // 第 5 帧：累计达到 2.0，复位并放行
        assert!(!gate.tick(&clock));
        assert!(!gate.pause_required());
    }

    #[test]
    fn test_setup_mid_count_extends() {
        let mut gate = RestGate::new();
        let clock = clock(0.5);

        gate.setup(2.0);
        assert!(gate.tick(&clock));

        // 计时中再次 setup：目标变为 3.0 而不是 1.0
        gate.setup(1.0);
        // 已累计 0.5；还需 5 帧到 3.0
        for _ in 0..5 {
            assert!(gate.tick(&clock));
        }
        assert!(!gate.tick(&clock));
    }

    #[test]
    fn test_setup_after_release_starts_fresh() {
        let mut gate = RestGate::new();
        let clock = clock(1.0);

        gate.setup(1.0);
        assert!(gate.tick(&clock));
        assert!(!gate.tick(&clock));

        gate.setup(1.0);
        assert!(gate.pause_required());
        assert!(gate.tick(&clock));
        assert!(!gate.tick(&clock));
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let mut gate = RestGate::new();
        assert!(!gate.tick(&clock(0.5)));
        assert!(!gate.pause_required());
    }

    #[test]
    fn test_reset_cancels_pending_pause() {
        let mut gate = RestGate::new();
        gate.setup(10.0);
        assert!(gate.pause_required());

        gate.reset();
        assert!(!gate.pause_required());
        assert!(!gate.tick(&clock(0.5)));
    }
}
