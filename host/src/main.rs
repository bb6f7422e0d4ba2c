//! 故事播放器 - headless 运行器
//!
//! 加载 `.story` 容器与脚本，按固定帧间隔推进播放器，
//! 把对话与事件写到日志。宿主负责错误展示：加载失败在这里落日志并退出。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use host::{HttpTransport, Player, PlayerEvent, StoryContainer, VerifyClient, VerifyRequest};

#[derive(Parser)]
#[command(name = "story-player")]
#[command(about = "故事播放器（headless 模式）")]
#[command(version)]
struct Args {
    /// .story 容器路径
    container: PathBuf,

    /// 脚本文件路径
    script: PathBuf,

    /// 最多推进的帧数
    #[arg(long, default_value_t = 3600)]
    frames: u32,

    /// 模拟帧率
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// 远程许可校验端点（可选）
    #[arg(long)]
    license_endpoint: Option<String>,

    /// 许可密钥（与 --license-endpoint 配合使用）
    #[arg(long, default_value = "")]
    license_key: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let container = match StoryContainer::load(&args.container) {
        Ok(container) => container,
        Err(e) => {
            error!("无法启动故事: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        title = %container.general().title,
        bytes = container.len(),
        "容器已加载"
    );

    let script = match std::fs::read_to_string(&args.script) {
        Ok(script) => script,
        Err(e) => {
            error!(path = %args.script.display(), "无法读取脚本: {e}");
            return ExitCode::FAILURE;
        }
    };

    let story_id = container.general().title.clone();
    let mut player = Player::new(container, &script);

    if let Some(endpoint) = &args.license_endpoint {
        let mut client = VerifyClient::new(Arc::new(HttpTransport::new(endpoint.clone())));
        client.submit(
            VerifyRequest {
                license_key: args.license_key.clone(),
                story_id,
            },
            |result| match result {
                Ok(response) if response.valid => info!("许可校验通过"),
                Ok(response) => warn!(message = %response.message, "许可校验未通过"),
                Err(e) => warn!("许可校验失败: {e}"),
            },
        );
        player.attach_verify(client);
    }

    let dt = 1.0 / args.fps.max(1.0);
    for frame in 0..args.frames {
        let out = match player.frame(dt) {
            Ok(out) => out,
            Err(e) => {
                error!(frame, "脚本错误: {e}");
                return ExitCode::FAILURE;
            }
        };

        for event in &out.events {
            match event {
                PlayerEvent::Dialogue { speaker, text } => match speaker {
                    Some(speaker) => info!("{speaker}: {text}"),
                    None => info!("{text}"),
                },
                PlayerEvent::SceneChanged { name } => info!(scene = %name, "场景切换"),
                PlayerEvent::ScriptEnded => {}
            }
        }

        if player.finished() && !out.paused {
            info!(frames = frame + 1, "播放结束");
            break;
        }
    }

    ExitCode::SUCCESS
}
