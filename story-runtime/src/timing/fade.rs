//! # ScreenFade 模块
//!
//! 整屏淡入淡出状态机。
//!
//! ## 状态转换
//!
//! ```text
//! Idle --start--> FadingIn --(opacity 到 255, 保持计时超过阈值)--> FadingOut --(opacity 到 0)--> Idle
//! ```
//!
//! 「保持」不是独立状态：opacity 已到 255 的 FadingIn 继续活跃，
//! 直到保持计时超过阈值；计时从 opacity 到 255 的那一帧就开始累计。
//! 阈值越过的那一帧发出一次 [`FadeEvent::HoldExpired`]
//! （带走挂起的场景切换），随后立刻在同一帧执行一步淡出，不浪费一帧。

use serde::{Deserialize, Serialize};

use super::AnimationClock;
use crate::command::{Rgb, Seconds};

/// 淡入淡出阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadePhase {
    /// 空闲
    #[default]
    Idle,
    /// 淡入中（含 opacity == 255 的保持期）
    FadingIn,
    /// 淡出中
    FadingOut,
}

/// 状态机对宿主发出的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FadeEvent {
    /// 保持期结束，恰好发出一次；`scene` 是挂起的场景切换（如有）
    HoldExpired { scene: Option<String> },
}

/// 整屏淡入淡出
///
/// 每个运行中的故事持有一个实例。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenFade {
    phase: FadePhase,
    /// 当前不透明度，0.0 - 255.0
    opacity: f32,
    hold_elapsed: f32,
    hold_threshold: f32,
    color: Rgb,
    fade_in_rate: f32,
    fade_out_rate: f32,
    pending_scene: Option<String>,
}

impl ScreenFade {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否正忙
    ///
    /// 忙 = 淡入中且尚未到 255，或淡出中且尚未到 0。
    /// opacity 已到 255 的保持期不算忙。
    pub fn is_busy(&self) -> bool {
        match self.phase {
            FadePhase::Idle => false,
            FadePhase::FadingIn => self.opacity < 255.0,
            FadePhase::FadingOut => self.opacity > 0.0,
        }
    }

    /// 启动一次淡入淡出
    ///
    /// 正忙时整个调用是 no-op，返回 `false`，已有状态不受影响。
    pub fn start(
        &mut self,
        color: Rgb,
        initial_opacity: f32,
        fade_in_rate: f32,
        fade_out_rate: f32,
        hold: Seconds,
        scene: Option<String>,
    ) -> bool {
        if self.is_busy() {
            return false;
        }

        self.phase = FadePhase::FadingIn;
        self.opacity = initial_opacity.clamp(0.0, 255.0);
        self.hold_elapsed = 0.0;
        self.hold_threshold = hold.get();
        self.color = color;
        self.fade_in_rate = fade_in_rate.max(0.0);
        self.fade_out_rate = fade_out_rate.max(0.0);
        self.pending_scene = scene;
        true
    }

    /// 每帧推进一次
    pub fn update(&mut self, clock: &AnimationClock) -> Option<FadeEvent> {
        let delta = clock.delta();

        match self.phase {
            FadePhase::Idle => None,
            FadePhase::FadingIn => {
                if self.opacity < 255.0 {
                    self.opacity = (self.opacity + self.fade_in_rate * delta).min(255.0);
                    if self.opacity < 255.0 {
                        return None;
                    }
                    // 本帧恰好到 255：保持计时从这一帧就开始累计
                }

                self.hold_elapsed += delta;
                if self.hold_elapsed <= self.hold_threshold {
                    return None;
                }

                // 保持期结束：带走挂起的场景切换，翻转到淡出，
                // 并在同一帧立刻执行一步淡出
                let scene = self.pending_scene.take();
                self.phase = FadePhase::FadingOut;
                self.step_out(delta);
                Some(FadeEvent::HoldExpired { scene })
            }
            FadePhase::FadingOut => {
                self.step_out(delta);
                None
            }
        }
    }

    fn step_out(&mut self, delta: f32) {
        self.opacity = (self.opacity - self.fade_out_rate * delta).max(0.0);
        if self.opacity <= 0.0 {
            self.phase = FadePhase::Idle;
        }
    }

    /// 绘制数据：`(颜色, 不透明度)` 的纯函数；空闲时无输出
    pub fn draw(&self) -> Option<(Rgb, u8)> {
        match self.phase {
            FadePhase::Idle => None,
            _ => Some((self.color, self.opacity.round() as u8)),
        }
    }

    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}
