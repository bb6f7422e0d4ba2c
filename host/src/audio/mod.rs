//! # Audio 模块
//!
//! 四条逻辑通道上的音频播放，使用 rodio 实现。
//!
//! ## 通道策略
//!
//! - **music**：独占槽位，可循环。同名曲目正在播放时忽略重复请求，
//!   播放位置保持连续；不同曲目则停掉当前、从头播放新曲目。
//! - **fx / voice / text**：每次请求都停掉通道上正在播放的声音并从头播放；
//!   仅当名称与上次装载的不同才重新解码。同名重播会重启，
//!   与 music 的忽略策略不对称，这是有意保留的行为。
//!
//! 策略裁决（[`ChannelBank`]）与放音（[`AudioManager`]）分层：
//! 策略层不碰设备，单元测试直接驱动它；放音层在没有音频设备时
//! 降级为纯策略模式，不影响其余子系统。
//!
//! 音频源字节一律经由容器的资源契约取得，这里不了解容器的字节布局。

use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use story_runtime::{Channel, Volume};

/// 播放请求的裁决结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    /// 同名音乐已在播放：忽略请求，不打断播放位置
    Suppress,
    /// 从头播放；`decode` 为真时名称与上次不同，需要重新装载字节
    Restart { decode: bool },
}

/// 单通道状态：装载的资源名、音量、循环标记（仅 music 使用）
#[derive(Debug, Clone)]
struct ChannelState {
    loaded: Option<String>,
    volume: f32,
    looping: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            loaded: None,
            volume: 1.0,
            looping: false,
        }
    }
}

fn slot(channel: Channel) -> usize {
    match channel {
        Channel::Music => 0,
        Channel::Fx => 1,
        Channel::Voice => 2,
        Channel::Text => 3,
    }
}

/// 四通道的纯策略层
#[derive(Debug, Clone, Default)]
pub struct ChannelBank {
    states: [ChannelState; 4],
}

impl ChannelBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// 裁决一次播放请求并更新通道状态
    ///
    /// `currently_playing` 由放音层给出（设备缺失时恒为假）。
    pub fn decide_play(
        &mut self,
        channel: Channel,
        name: &str,
        looping: bool,
        currently_playing: bool,
    ) -> PlayAction {
        let state = &mut self.states[slot(channel)];

        if channel == Channel::Music && currently_playing && state.loaded.as_deref() == Some(name)
        {
            return PlayAction::Suppress;
        }

        let decode = state.loaded.as_deref() != Some(name);
        state.loaded = Some(name.to_string());
        if channel == Channel::Music {
            state.looping = looping;
        }
        PlayAction::Restart { decode }
    }

    /// 设置通道音量，返回生效值
    pub fn set_volume(&mut self, channel: Channel, volume: Volume) -> f32 {
        self.states[slot(channel)].volume = volume.get();
        volume.get()
    }

    pub fn volume(&self, channel: Channel) -> f32 {
        self.states[slot(channel)].volume
    }

    /// 通道上最后装载的资源名
    pub fn loaded(&self, channel: Channel) -> Option<&str> {
        self.states[slot(channel)].loaded.as_deref()
    }

    /// music 通道的循环标记
    pub fn looping(&self, channel: Channel) -> bool {
        self.states[slot(channel)].looping
    }
}

/// 音频管理器：策略层 + rodio 放音层
pub struct AudioManager {
    /// 输出流必须保持存活；设备缺失时为 `None`（静默模式）
    output: Option<(OutputStream, OutputStreamHandle)>,
    sinks: [Option<Sink>; 4],
    /// 每通道缓存的源字节，名称不变的重播直接复用
    cached: [Option<Vec<u8>>; 4],
    bank: ChannelBank,
}

impl AudioManager {
    /// 创建管理器；没有可用的音频设备时降级为静默模式
    pub fn new() -> Self {
        let output = match OutputStream::try_default() {
            Ok((stream, handle)) => Some((stream, handle)),
            Err(e) => {
                warn!("音频输出初始化失败，进入静默模式: {e}");
                None
            }
        };
        Self {
            output,
            sinks: [None, None, None, None],
            cached: [None, None, None, None],
            bank: ChannelBank::new(),
        }
    }

    /// 在指定通道播放一段音频
    ///
    /// `looping` 只对 music 通道有意义。
    pub fn play(&mut self, channel: Channel, name: &str, bytes: &[u8], looping: bool) {
        let playing = self.is_playing(channel);
        match self.bank.decide_play(channel, name, looping, playing) {
            PlayAction::Suppress => {
                debug!(name, "音乐已在播放，忽略重复请求");
            }
            PlayAction::Restart { decode } => {
                if decode {
                    self.cached[slot(channel)] = Some(bytes.to_vec());
                }
                self.restart(channel, name);
            }
        }
    }

    /// 停止单个通道
    pub fn stop(&mut self, channel: Channel) {
        if let Some(sink) = self.sinks[slot(channel)].take() {
            sink.stop();
        }
    }

    /// 停止全部通道
    pub fn stop_all(&mut self) {
        for channel in Channel::ALL {
            self.stop(channel);
        }
    }

    /// 设置通道音量，立即作用于正在播放的声音
    pub fn set_volume(&mut self, channel: Channel, volume: Volume) {
        let effective = self.bank.set_volume(channel, volume);
        if let Some(sink) = &self.sinks[slot(channel)] {
            sink.set_volume(effective);
        }
    }

    /// 通道上是否有声音在播放
    pub fn is_playing(&self, channel: Channel) -> bool {
        self.sinks[slot(channel)]
            .as_ref()
            .is_some_and(|sink| !sink.empty())
    }

    /// 策略层状态（诊断/测试用）
    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }

    /// 停掉通道上的声音并从缓存字节从头播放
    fn restart(&mut self, channel: Channel, name: &str) {
        let index = slot(channel);
        if let Some(sink) = self.sinks[index].take() {
            sink.stop();
        }

        let Some((_, handle)) = &self.output else {
            return;
        };
        let Some(bytes) = self.cached[index].clone() else {
            return;
        };

        let source = match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => source,
            Err(e) => {
                warn!(name, "音频解码失败: {e}");
                return;
            }
        };
        let sink = match Sink::try_new(handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(name, "创建播放槽失败: {e}");
                return;
            }
        };

        sink.set_volume(self.bank.volume(channel));
        if channel == Channel::Music && self.bank.looping(channel) {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        self.sinks[index] = Some(sink);
    }
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_same_name_while_playing_suppressed() {
        let mut bank = ChannelBank::new();

        assert_eq!(
            bank.decide_play(Channel::Music, "a.ogg", true, false),
            PlayAction::Restart { decode: true }
        );
        // 同名且正在播放：忽略，不打断连续性
        assert_eq!(
            bank.decide_play(Channel::Music, "a.ogg", true, true),
            PlayAction::Suppress
        );
        // 曲目播完后同名重播：重启，字节已缓存无需重新装载
        assert_eq!(
            bank.decide_play(Channel::Music, "a.ogg", true, false),
            PlayAction::Restart { decode: false }
        );
    }

    #[test]
    fn test_music_different_name_replaces() {
        let mut bank = ChannelBank::new();
        bank.decide_play(Channel::Music, "a.ogg", false, false);

        assert_eq!(
            bank.decide_play(Channel::Music, "b.ogg", true, true),
            PlayAction::Restart { decode: true }
        );
        assert_eq!(bank.loaded(Channel::Music), Some("b.ogg"));
        assert!(bank.looping(Channel::Music));
    }

    #[test]
    fn test_fx_same_name_always_restarts() {
        let mut bank = ChannelBank::new();

        assert_eq!(
            bank.decide_play(Channel::Fx, "b.wav", false, false),
            PlayAction::Restart { decode: true }
        );
        // 与 music 不对称：同名播放中也重启，仅省去解码
        assert_eq!(
            bank.decide_play(Channel::Fx, "b.wav", false, true),
            PlayAction::Restart { decode: false }
        );
        assert_eq!(
            bank.decide_play(Channel::Fx, "c.wav", false, true),
            PlayAction::Restart { decode: true }
        );
    }

    #[test]
    fn test_voice_and_text_follow_fx_policy() {
        let mut bank = ChannelBank::new();
        for channel in [Channel::Voice, Channel::Text] {
            bank.decide_play(channel, "line1.ogg", false, false);
            assert_eq!(
                bank.decide_play(channel, "line1.ogg", false, true),
                PlayAction::Restart { decode: false }
            );
        }
    }

    #[test]
    fn test_channel_volumes_independent() {
        let mut bank = ChannelBank::new();
        assert_eq!(bank.volume(Channel::Voice), 1.0);

        bank.set_volume(Channel::Voice, Volume::clamped(0.25));
        bank.set_volume(Channel::Music, Volume::clamped(2.0));
        assert_eq!(bank.volume(Channel::Voice), 0.25);
        assert_eq!(bank.volume(Channel::Music), 1.0);
        assert_eq!(bank.volume(Channel::Fx), 1.0);
    }

    #[test]
    fn test_manager_tracks_policy_without_device() {
        // 静默模式下策略状态照常推进
        let mut manager = AudioManager::new();
        manager.play(Channel::Fx, "door.wav", b"RIFFxxxx", false);
        manager.set_volume(Channel::Fx, Volume::clamped(0.5));

        assert_eq!(manager.bank().loaded(Channel::Fx), Some("door.wav"));
        assert_eq!(manager.bank().volume(Channel::Fx), 0.5);

        manager.stop(Channel::Fx);
        manager.stop_all();
        assert!(!manager.is_playing(Channel::Fx));
    }
}
