//! # Player 模块
//!
//! 按帧驱动的播放器：把 `story-runtime` 的指令流落到宿主子系统上。
//!
//! ## 帧内顺序
//!
//! 每帧固定为：推进时钟 → drain 许可校验队列 → 更新整屏淡入淡出 →
//! 推进暂停闸门 → 未暂停时从读取器消费**一条**指令并做 tag-switch 分发 →
//! 推进精灵动画 → 产出绘制数据。除同步资源解码外没有阻塞操作，
//! 解码失败不重试。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use story_runtime::{
    AnimationClock, Channel, ContentKind, FADE_RATE, FadeEvent, Instruction, MOVE_RATE,
    ROTATE_RATE, RestGate, Rgb, SCALE_RATE, ScreenFade, ScriptReader, Smoothing, VariableTable,
    VnError,
};

use crate::audio::AudioManager;
use crate::container::StoryContainer;
use crate::sprites::{FontSheet, Sprite, SpriteStore};
use crate::verify::VerifyClient;

/// 匀速逼近目标的数值渐变
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tween {
    target: f32,
    /// 每秒变化量
    rate: f32,
}

impl Tween {
    /// 推进一步；到达目标返回 `None`
    fn advance(self, current: f32, delta: f32) -> (f32, Option<Tween>) {
        let step = self.rate * delta;
        if (self.target - current).abs() <= step {
            (self.target, None)
        } else if self.target > current {
            (current + step, Some(self))
        } else {
            (current - step, Some(self))
        }
    }
}

/// 进行中的移动
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// 速度（像素/秒）
    pub vx: f32,
    pub vy: f32,
    pub smoothing: Smoothing,
}

/// 舞台上的一个精灵及其动画状态
#[derive(Clone)]
pub struct StageSprite {
    pub sprite: Arc<Sprite>,
    pub kind: ContentKind,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// 旋转角（度）
    pub rotation: f32,
    /// 0 - 255
    pub opacity: f32,
    motion: Option<Motion>,
    scale_tween: Option<Tween>,
    rotate_tween: Option<Tween>,
    fade_tween: Option<Tween>,
}

impl StageSprite {
    fn new(sprite: Arc<Sprite>, kind: ContentKind) -> Self {
        Self {
            sprite,
            kind,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 255.0,
            motion: None,
            scale_tween: None,
            rotate_tween: None,
            fade_tween: None,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// 每帧推进移动与各渐变
    fn update(&mut self, delta: f32) {
        if let Some(motion) = &self.motion {
            self.x += motion.vx * delta;
            self.y += motion.vy * delta;
        }
        if let Some(tween) = self.scale_tween.take() {
            (self.scale, self.scale_tween) = tween.advance(self.scale, delta);
        }
        if let Some(tween) = self.rotate_tween.take() {
            (self.rotation, self.rotate_tween) = tween.advance(self.rotation, delta);
        }
        if let Some(tween) = self.fade_tween.take() {
            (self.opacity, self.fade_tween) = tween.advance(self.opacity, delta);
        }
    }
}

/// 播放器对宿主发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// 对话文本（`speaker` 为 `None` 表示旁白）
    Dialogue {
        speaker: Option<String>,
        text: String,
    },
    /// 场景已切换
    SceneChanged { name: String },
    /// 脚本读取完毕
    ScriptEnded,
}

/// 一帧的输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub events: Vec<PlayerEvent>,
    /// 整屏淡入淡出的绘制数据 `(颜色, 不透明度)`
    pub overlay: Option<(Rgb, u8)>,
    /// 暂停闸门本帧是否拦住了脚本读取
    pub paused: bool,
}

/// 一次运行中的故事
///
/// 持有容器、脚本读取器与全部宿主子系统；生命周期与故事一致。
pub struct Player {
    container: StoryContainer,
    reader: ScriptReader,
    clock: AnimationClock,
    rest: RestGate,
    fade: ScreenFade,
    sprites: SpriteStore,
    audio: AudioManager,
    verify: Option<VerifyClient>,
    /// 展示名（别名优先）→ 舞台状态
    stage: HashMap<String, StageSprite>,
    background: Option<String>,
    font: Option<FontSheet>,
    script_ended: bool,
}

impl Player {
    pub fn new(container: StoryContainer, script: &str) -> Self {
        Self::with_vars(container, script, VariableTable::new())
    }

    /// 带宿主提供的初始变量表创建
    pub fn with_vars(container: StoryContainer, script: &str, vars: VariableTable) -> Self {
        Self {
            container,
            reader: ScriptReader::with_vars(script, vars),
            clock: AnimationClock::new(),
            rest: RestGate::new(),
            fade: ScreenFade::new(),
            sprites: SpriteStore::new(),
            audio: AudioManager::new(),
            verify: None,
            stage: HashMap::new(),
            background: None,
            font: None,
            script_ended: false,
        }
    }

    /// 挂接许可校验客户端；其队列将在每帧开头被 drain
    pub fn attach_verify(&mut self, client: VerifyClient) {
        self.verify = Some(client);
    }

    pub fn verify_mut(&mut self) -> Option<&mut VerifyClient> {
        self.verify.as_mut()
    }

    /// 推进一帧
    ///
    /// 条件求值的格式错误（如非法区间文本）从读取器向上传播，
    /// 是否致命由宿主决定。
    pub fn frame(&mut self, dt: f32) -> Result<FrameOutput, VnError> {
        let mut out = FrameOutput::default();
        self.clock.advance(dt);

        if let Some(verify) = &mut self.verify {
            verify.drain();
        }

        if let Some(FadeEvent::HoldExpired { scene }) = self.fade.update(&self.clock)
            && let Some(name) = scene
        {
            self.change_scene(&name, &mut out);
        }

        let resting = self.rest.tick(&self.clock);
        out.paused = resting;

        if !resting && !self.script_ended {
            match self.reader.next()? {
                Some(instruction) => self.dispatch(instruction, &mut out),
                None => {
                    self.script_ended = true;
                    out.events.push(PlayerEvent::ScriptEnded);
                    info!("脚本读取完毕");
                }
            }
        }

        let delta = self.clock.delta();
        for sprite in self.stage.values_mut() {
            sprite.update(delta);
        }

        out.overlay = self.fade.draw();
        Ok(out)
    }

    /// 脚本是否已读完
    pub fn finished(&self) -> bool {
        self.script_ended
    }

    pub fn stage(&self) -> &HashMap<String, StageSprite> {
        &self.stage
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn font(&self) -> Option<&FontSheet> {
        self.font.as_ref()
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    pub fn vars(&self) -> &VariableTable {
        self.reader.vars()
    }

    /// 指令分发：对封闭并集做一次 tag-switch
    fn dispatch(&mut self, instruction: Instruction, out: &mut FrameOutput) {
        match instruction {
            Instruction::ShowSprite { kind, name, alias } => {
                // 带别名：全新实例，不进也不查缓存
                let sprite = match &alias {
                    Some(_) => self.sprites.get_fresh(&self.container, kind, &name),
                    None => self.sprites.get(&self.container, kind, &name),
                };
                let Some(sprite) = sprite else {
                    warn!(name = %name, kind = kind.tag(), "精灵缺失，忽略 show");
                    return;
                };
                let stage_name = alias.unwrap_or(name);
                self.stage
                    .insert(stage_name, StageSprite::new(sprite, kind));
            }
            Instruction::HideSprite { kind, name } => {
                if self.stage.get(&name).is_some_and(|s| s.kind == kind) {
                    self.stage.remove(&name);
                }
            }
            Instruction::ClearSprites { kind } => {
                self.stage.retain(|_, sprite| sprite.kind != kind);
            }
            Instruction::MoveSprite {
                name,
                x_row,
                y_row,
                smoothing,
            } => {
                if smoothing == Smoothing::Unknown {
                    warn!(name = %name, "未识别的平滑关键字，按匀速处理");
                }
                if let Some(sprite) = self.stage.get_mut(&name) {
                    sprite.motion = Some(Motion {
                        vx: MOVE_RATE.value(x_row) as f32,
                        vy: MOVE_RATE.value(y_row) as f32,
                        smoothing,
                    });
                } else {
                    debug!(name = %name, "move 的目标不在舞台上");
                }
            }
            Instruction::StopMove { name, edge } => {
                if let Some(sprite) = self.stage.get_mut(&name) {
                    sprite.motion = None;
                    debug!(name = %name, ?edge, "停止移动");
                }
            }
            Instruction::ScaleSprite { name, row, target } => {
                if let Some(sprite) = self.stage.get_mut(&name) {
                    sprite.scale_tween = Some(Tween {
                        target,
                        rate: SCALE_RATE.value(row) as f32,
                    });
                }
            }
            Instruction::RotateSprite { name, row, degrees } => {
                if let Some(sprite) = self.stage.get_mut(&name) {
                    sprite.rotate_tween = Some(Tween {
                        target: degrees,
                        rate: ROTATE_RATE.value(row) as f32,
                    });
                }
            }
            Instruction::FadeSprite { name, row, opacity } => {
                if let Some(sprite) = self.stage.get_mut(&name) {
                    sprite.fade_tween = Some(Tween {
                        target: opacity.clamp(0.0, 255.0),
                        rate: FADE_RATE.value(row) as f32,
                    });
                }
            }
            Instruction::Rest { seconds } => match seconds {
                Some(seconds) => self.rest.setup(seconds.get()),
                None => self.rest.reset(),
            },
            Instruction::ScreenFade {
                color,
                fade_in_row,
                fade_out_row,
                hold,
                scene,
            } => {
                let accepted = self.fade.start(
                    color,
                    0.0,
                    FADE_RATE.value(fade_in_row) as f32,
                    FADE_RATE.value(fade_out_row) as f32,
                    hold,
                    scene,
                );
                if !accepted {
                    debug!("整屏淡入淡出正忙，忽略请求");
                }
            }
            Instruction::ChangeScene { name } => self.change_scene(&name, out),
            Instruction::Say { speaker, text } => {
                out.events.push(PlayerEvent::Dialogue { speaker, text });
            }
            Instruction::SetFont { name } => {
                match self.sprites.font_sheet(&self.container, &name) {
                    Some(sheet) => self.font = Some(sheet),
                    None => warn!(name = %name, "字模图集或伴生属性缺失"),
                }
            }
            Instruction::PlayMusic { name, looping } => {
                self.play_audio(Channel::Music, ContentKind::Music, &name, looping);
            }
            Instruction::PlaySound { channel, name } => {
                self.play_audio(channel, ContentKind::Audio, &name, false);
            }
            Instruction::StopAudio { channel } => match channel {
                Some(channel) => self.audio.stop(channel),
                None => self.audio.stop_all(),
            },
            Instruction::SetVolume { channel, volume } => {
                self.audio.set_volume(channel, volume);
            }
            // 条件族与 set 在读取器内部消化，不会到达这里
            Instruction::Case { .. }
            | Instruction::OrCase { .. }
            | Instruction::CaseElse { .. }
            | Instruction::CaseEnd { .. }
            | Instruction::SetVar { .. } => {}
        }
    }

    fn play_audio(&mut self, channel: Channel, kind: ContentKind, name: &str, looping: bool) {
        let Some(bytes) = self.container.asset_bytes(kind, name) else {
            warn!(name, kind = kind.tag(), "音频资源缺失");
            return;
        };
        self.audio.play(channel, name, bytes, looping);
    }

    fn change_scene(&mut self, name: &str, out: &mut FrameOutput) {
        // 背景同样走精灵缓存；缺失只告警，场景名照常切换
        if self
            .sprites
            .get(&self.container, ContentKind::Background, name)
            .is_none()
        {
            warn!(name, "场景背景缺失");
        }
        self.background = Some(name.to_string());
        out.events.push(PlayerEvent::SceneChanged {
            name: name.to_string(),
        });
        info!(name, "场景切换");
    }
}
