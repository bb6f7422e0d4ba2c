//! # Host 层
//!
//! 故事播放器的宿主层：容器 IO、资源解码、音频播放、许可校验与帧循环。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 加载编译后的故事容器（[`container`]）
//! - 解码精灵并维护按名缓存（[`sprites`]）
//! - 在四条逻辑通道上播放音频（[`audio`]）
//! - 远程许可校验的工作线程与回调队列（[`verify`]）
//! - 按帧驱动 `story-runtime` 并分发指令副作用（[`player`]）
//!
//! Host 层不包含脚本逻辑：脚本的解析、条件求值、变量替换与计时状态机
//! 全部在 `story-runtime` 中，这里只执行它发出的 [`story_runtime::Instruction`]。

pub mod audio;
pub mod container;
pub mod player;
pub mod sprites;
pub mod verify;

pub use audio::{AudioManager, ChannelBank, PlayAction};
pub use container::{
    AssetEntry, AssetRange, ContainerError, DetailHeader, FontSpriteProperties, GeneralHeader,
    StoryContainer,
};
pub use player::{FrameOutput, Player, PlayerEvent};
pub use sprites::{FontSheet, Sprite, SpriteStore};
pub use verify::{
    HttpTransport, RequestHandle, VerifyClient, VerifyError, VerifyRequest, VerifyResponse,
    VerifyTransport,
};
