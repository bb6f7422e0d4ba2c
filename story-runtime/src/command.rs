//! # Command 模块
//!
//! 定义脚本行绑定后的指令模型（[`Instruction`]）。
//!
//! ## 设计原则
//!
//! - **封闭集合**：每个脚本操作对应一个变体，字段顺序与类型固定
//! - **构造期校验**：时长限幅、关键字小写化都发生在构造时，之后不再变化
//! - **宽容降级**：无法识别的枚举关键字归入保留的 `Unknown` 标签，
//!   而不是让编辑期的笔误直接报错；是否致命由执行方决定

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::condition::Condition;

/// 资源类别标签
///
/// 容器 DetailHeader 中的固定分类键，每类资源一个。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// 角色立绘
    Character,
    /// 物件
    Object,
    /// 背景
    Background,
    /// 字模图集
    FontSheet,
    /// 对话框贴图
    DialogSprite,
    /// 音效/语音
    Audio,
    /// 音乐
    Music,
}

impl ContentKind {
    /// 所有类别（遍历用）
    pub const ALL: [ContentKind; 7] = [
        Self::Character,
        Self::Object,
        Self::Background,
        Self::FontSheet,
        Self::DialogSprite,
        Self::Audio,
        Self::Music,
    ];

    /// DetailHeader 中的分类键
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Object => "object",
            Self::Background => "background",
            Self::FontSheet => "font_sheet",
            Self::DialogSprite => "dialog_sprite",
            Self::Audio => "audio",
            Self::Music => "music",
        }
    }

    /// 是否走精灵缓存（character/object/background/dialog_sprite）
    pub fn is_sprite(&self) -> bool {
        matches!(
            self,
            Self::Character | Self::Object | Self::Background | Self::DialogSprite
        )
    }
}

impl FromStr for ContentKind {
    type Err = ();

    /// 从字符串解析类别（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "character" => Ok(Self::Character),
            "object" => Ok(Self::Object),
            "background" => Ok(Self::Background),
            "font_sheet" => Ok(Self::FontSheet),
            "dialog_sprite" => Ok(Self::DialogSprite),
            "audio" => Ok(Self::Audio),
            "music" => Ok(Self::Music),
            _ => Err(()),
        }
    }
}

/// 逻辑音频通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// 音乐（独占槽位，可循环）
    Music,
    /// 音效
    Fx,
    /// 语音
    Voice,
    /// 文字音
    Text,
}

impl Channel {
    /// 所有通道（`stop audio` 不带参数时遍历用）
    pub const ALL: [Channel; 4] = [Self::Music, Self::Fx, Self::Voice, Self::Text];
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "music" => Ok(Self::Music),
            "fx" => Ok(Self::Fx),
            "voice" => Ok(Self::Voice),
            "text" => Ok(Self::Text),
            _ => Err(()),
        }
    }
}

/// 移动平滑方式
///
/// 关键字在赋值时统一转为小写；无法识别的值归入 [`Smoothing::Unknown`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// 无平滑（匀速）
    None,
    /// 渐入
    EaseIn,
    /// 渐出
    EaseOut,
    /// 两端平滑
    EaseBoth,
    /// 未识别的关键字
    Unknown,
}

impl Smoothing {
    /// 从脚本关键字解析（先小写化；未识别 -> Unknown）
    pub fn from_keyword(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "ease_in" | "easein" => Self::EaseIn,
            "ease_out" | "easeout" => Self::EaseOut,
            "ease_both" | "easeboth" => Self::EaseBoth,
            _ => Self::Unknown,
        }
    }
}

/// 停止位置关键字（移动停止条件要检查的边）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopEdge {
    Left,
    Right,
    Top,
    Bottom,
    /// 未识别的关键字
    Unknown,
}

impl StopEdge {
    /// 从脚本关键字解析（先小写化；未识别 -> Unknown）
    pub fn from_keyword(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            _ => Self::Unknown,
        }
    }
}

/// 限幅时长（秒）
///
/// 构造时静默限幅到 `[0.01, 100.0]`，之后只读。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seconds(f32);

impl Seconds {
    /// 下限（秒）
    pub const MIN: f32 = 0.01;
    /// 上限（秒）
    pub const MAX: f32 = 100.0;

    /// 构造并限幅
    pub fn clamped(raw: f32) -> Self {
        Self(raw.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// 限幅音量
///
/// 构造时限幅到 `[0.0, 1.0]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(f32);

impl Volume {
    pub fn clamped(raw: f32) -> Self {
        Self(raw.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    /// 从脚本参数解析颜色
    ///
    /// 支持 `#rrggbb` 十六进制与 `black` / `white` 两个命名值。
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "black" => return Some(Self::BLACK),
            "white" => return Some(Self::WHITE),
            _ => {}
        }
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

/// 解析后的脚本指令
///
/// 外部行解析器按「指令名 + 参数个数」绑定到具体变体（见 `parser` 模块）；
/// 解释器对其做一次 tag-switch 分发，变体之间互不依赖。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// 显示精灵；`alias` 存在时总是构造全新实例且不写入原名缓存槽
    ShowSprite {
        kind: ContentKind,
        name: String,
        alias: Option<String>,
    },

    /// 隐藏精灵
    HideSprite { kind: ContentKind, name: String },

    /// 清除某一类的全部精灵
    ClearSprites { kind: ContentKind },

    /// 按速率行号移动精灵
    MoveSprite {
        name: String,
        x_row: i32,
        y_row: i32,
        smoothing: Smoothing,
    },

    /// 停止移动；`edge` 省略时为短变体（立即停止，不检查边）
    StopMove {
        name: String,
        edge: Option<StopEdge>,
    },

    /// 按速率行号缩放到目标比例
    ScaleSprite { name: String, row: i32, target: f32 },

    /// 按速率行号旋转到目标角度
    RotateSprite { name: String, row: i32, degrees: f32 },

    /// 按速率行号渐变到目标不透明度（0-255）
    FadeSprite { name: String, row: i32, opacity: f32 },

    /// 暂停脚本读取；`seconds` 省略时为短变体（解除当前暂停）
    Rest { seconds: Option<Seconds> },

    /// 整屏淡入淡出；`scene` 存在时在保持期结束后切换场景
    ScreenFade {
        color: Rgb,
        fade_in_row: i32,
        fade_out_row: i32,
        hold: Seconds,
        scene: Option<String>,
    },

    /// 立即切换场景背景
    ChangeScene { name: String },

    /// 对话文本（`speaker` 为 None 表示旁白）
    Say {
        speaker: Option<String>,
        text: String,
    },

    /// 切换字模图集
    SetFont { name: String },

    /// 播放音乐（独占槽位）
    PlayMusic { name: String, looping: bool },

    /// 在 fx/voice/text 通道播放声音
    PlaySound { channel: Channel, name: String },

    /// 停止音频；`channel` 省略时停止全部通道
    StopAudio { channel: Option<Channel> },

    /// 设置通道音量
    SetVolume { channel: Channel, volume: Volume },

    /// 写入脚本变量（变量名不含 `$` 前缀）
    SetVar { name: String, value: String },

    /// 条件分支开始
    Case { id: String, condition: Condition },

    /// 备选分支（跳过状态下仍会被求值的结构标记）
    OrCase { id: String, condition: Condition },

    /// 否则分支（结构标记）
    CaseElse { id: String },

    /// 条件分支结束（结构标记）
    CaseEnd { id: String },
}

impl Instruction {
    /// 是否为结构标记
    ///
    /// 结构标记在跳过状态下也会被求值，跳过状态机依赖它们退出或转入备选分支。
    pub fn is_structural_marker(&self) -> bool {
        matches!(
            self,
            Self::OrCase { .. } | Self::CaseElse { .. } | Self::CaseEnd { .. }
        )
    }
}
