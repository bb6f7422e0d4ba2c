//! # Story Runtime
//!
//! 互动故事播放器的核心运行时库。
//!
//! ## 架构概述
//!
//! `story-runtime` 是纯逻辑核心，不依赖任何 IO、解码或渲染引擎。
//! 宿主层（Host）按帧驱动它：
//!
//! ```text
//! Host                               Runtime
//!   │                                   │
//!   │── advance(dt) ──────────────────►│ AnimationClock
//!   │── tick() ───────────────────────►│ RestGate / ScreenFade
//!   │── next() ───────────────────────►│ ScriptReader
//!   │◄─── Instruction / FadeEvent ─────│
//!   │                                   │
//! ```
//!
//! 宿主拿到 [`Instruction`] 后做一次 tag-switch，把副作用
//! （精灵、音频、计时）落到自己的子系统里。
//!
//! ## 模块结构
//!
//! - [`command`]：指令模型（封闭的 tagged union + 构造期校验）
//! - [`parser`]：行解析器（指令名 + 参数个数绑定）
//! - [`condition`]：条件求值与跳过判定
//! - [`vars`]：变量表与 `($name)` 替换
//! - [`reader`]：脚本读取器（跳过状态机）
//! - [`timing`]：帧驱动计时状态机
//! - [`error`]：错误类型定义

pub mod command;
pub mod condition;
pub mod error;
pub mod parser;
pub mod reader;
pub mod timing;
pub mod vars;

// 重导出核心类型
pub use command::{
    Channel, ContentKind, Instruction, Rgb, Seconds, Smoothing, StopEdge, Volume,
};
pub use condition::{Condition, ConditionError, ConditionOp, should_evaluate};
pub use error::{ParseError, VnError, VnResult};
pub use parser::parse_line;
pub use reader::ScriptReader;
pub use timing::{
    AnimationClock, FADE_RATE, FadeEvent, FadePhase, MOVE_RATE, ROTATE_RATE, RateTable, RestGate,
    SCALE_RATE, ScreenFade,
};
pub use vars::{MAX_RESOLVE_PASSES, VariableTable, resolve};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let _cmd = Instruction::Say {
            speaker: Some("Test".to_string()),
            text: "Hello".to_string(),
        };

        let _cond = Condition::new("5", "5", ConditionOp::Is);
        let _table = VariableTable::new();
        let _clock = AnimationClock::new();
        let _gate = RestGate::new();
        let _fade = ScreenFade::new();
        let _reader = ScriptReader::new("say hi\n");
    }
}
