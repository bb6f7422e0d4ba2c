//! # Story Packer
//!
//! 故事打包工具 - 把资源目录编译为 `.story` 容器。
//!
//! ## 资源目录布局
//!
//! ```text
//! assets/
//!   character/             角色立绘
//!   object/                物件
//!   background/            背景
//!   font_sheet/            字模图集
//!   dialog_sprite/         对话框贴图
//!   audio/                 音效/语音
//!   music/                 音乐
//!   font_properties.json   字模切分属性（可选）
//!   story.json             故事元数据（可选）
//! ```
//!
//! 资源名取文件名去掉扩展名；页脚与头的编码跟容器读取器共用同一套
//! `host::container::header` 常量，写读两侧不会漂移。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p story-packer -- --input assets --output game.story
//! cargo run -p story-packer -- list game.story
//! cargo run -p story-packer -- verify game.story --input assets
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use host::container::header::encode_footer;
use host::{AssetEntry, AssetRange, DetailHeader, FontSpriteProperties, GeneralHeader, StoryContainer};
use story_runtime::ContentKind;

#[derive(Parser)]
#[command(name = "packer")]
#[command(about = "故事打包工具 - 把资源目录编译为 .story 容器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 输入目录（默认：assets）
    #[arg(short, long, default_value = "assets")]
    input: PathBuf,

    /// 输出容器文件（默认：game.story）
    #[arg(short, long, default_value = "game.story")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出容器内容
    List {
        /// 容器文件路径
        container: PathBuf,
    },

    /// 校验容器完整性（重切每个资源并核对字节数）
    Verify {
        /// 容器文件路径
        container: PathBuf,

        /// 原始目录（提供时逐字节对比）
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => pack(&cli.input, &cli.output),
        Some(Commands::List { container }) => list(&container),
        Some(Commands::Verify { container, input }) => verify(&container, input.as_deref()),
    }
}

/// 打包资源目录为容器文件
fn pack(input: &Path, output: &Path) -> anyhow::Result<()> {
    println!("📦 打包资源目录: {} -> {}", input.display(), output.display());

    if !input.is_dir() {
        bail!("输入目录不存在: {}", input.display());
    }

    let mut bytes = Vec::new();
    let mut detail = DetailHeader::default();
    let mut file_count = 0usize;

    for kind in ContentKind::ALL {
        let dir = input.join(kind.tag());
        if !dir.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if detail.section(kind).contains_key(&name) {
                bail!("资源重名: {}/{}", kind.tag(), name);
            }

            let data =
                std::fs::read(path).with_context(|| format!("读取 {} 失败", path.display()))?;
            let from = bytes.len();
            bytes.extend_from_slice(&data);
            let range = AssetRange {
                from,
                to: bytes.len(),
            };
            detail
                .section_mut(kind)
                .insert(name.clone(), AssetEntry::new(&range, extension));

            file_count += 1;
            println!("  + {}/{} ({} bytes)", kind.tag(), name, data.len());
        }
    }

    let font_properties_path = input.join("font_properties.json");
    if font_properties_path.is_file() {
        let text = std::fs::read_to_string(&font_properties_path)?;
        detail.font_properties =
            serde_json::from_str::<HashMap<String, FontSpriteProperties>>(&text)
                .context("font_properties.json 无法解析")?;
    }

    let story_path = input.join("story.json");
    let general: GeneralHeader = if story_path.is_file() {
        serde_json::from_str(&std::fs::read_to_string(&story_path)?)
            .context("story.json 无法解析")?
    } else {
        GeneralHeader::default()
    };

    let detail_json = serde_json::to_vec(&detail)?;
    let detail_range = AssetRange {
        from: bytes.len(),
        to: bytes.len() + detail_json.len(),
    };
    bytes.extend_from_slice(&detail_json);

    let general_json = serde_json::to_vec(&general)?;
    let general_range = AssetRange {
        from: bytes.len(),
        to: bytes.len() + general_json.len(),
    };
    bytes.extend_from_slice(&general_json);

    let footer =
        encode_footer(&detail_range, &general_range).context("头区间超出页脚字段宽度")?;
    bytes.extend_from_slice(&footer);

    let mut file =
        File::create(output).with_context(|| format!("创建 {} 失败", output.display()))?;
    file.write_all(&bytes)?;

    println!();
    println!("✅ 打包完成！");
    println!("   资源数: {file_count}");
    println!(
        "   容器大小: {:.2} MB",
        bytes.len() as f64 / 1024.0 / 1024.0
    );
    println!("   输出文件: {}", output.display());

    Ok(())
}

/// 列出容器内容
fn list(path: &Path) -> anyhow::Result<()> {
    let container = StoryContainer::load(path)?;
    let general = container.general();

    println!("📋 {} ({} bytes)", path.display(), container.len());
    if !general.title.is_empty() {
        println!("   标题: {}", general.title);
    }
    println!("   窗口: {}x{}", general.window_width, general.window_height);
    println!();

    for kind in ContentKind::ALL {
        let section = container.detail().section(kind);
        if section.is_empty() {
            continue;
        }

        println!("{} ({})", kind.tag(), section.len());
        let mut names: Vec<_> = section.keys().collect();
        names.sort();
        for name in names {
            let entry = &section[name];
            let size = container.asset_bytes(kind, name).map_or(0, <[u8]>::len);
            println!("  {:<32} {:>10} bytes  .{}", name, size, entry.extension());
        }
    }

    if !container.detail().font_properties.is_empty() {
        println!(
            "font_properties ({})",
            container.detail().font_properties.len()
        );
    }

    Ok(())
}

/// 校验容器完整性
fn verify(path: &Path, input: Option<&Path>) -> anyhow::Result<()> {
    println!("🔍 校验容器: {}", path.display());

    let container = StoryContainer::load(path)?;
    let mut errors = Vec::new();
    let mut checked = 0usize;

    for kind in ContentKind::ALL {
        for (name, entry) in container.detail().section(kind) {
            checked += 1;

            let Some(bytes) = container.asset_bytes(kind, name) else {
                errors.push(format!("{}/{}: 切片缺失", kind.tag(), name));
                continue;
            };
            let Some(range) = AssetRange::parse(entry.range_str()) else {
                errors.push(format!(
                    "{}/{}: 区间 '{}' 无法解析",
                    kind.tag(),
                    name,
                    entry.range_str()
                ));
                continue;
            };
            if bytes.len() != range.len() {
                errors.push(format!(
                    "{}/{}: 字节数不符，期望 {} 实际 {}",
                    kind.tag(),
                    name,
                    range.len(),
                    bytes.len()
                ));
            }

            // 提供源目录时逐字节对比
            if let Some(input) = input {
                let source = input
                    .join(kind.tag())
                    .join(format!("{}.{}", name, entry.extension()));
                match std::fs::read(&source) {
                    Ok(original) if original != bytes => {
                        errors.push(format!("{}/{}: 内容与源文件不一致", kind.tag(), name));
                    }
                    Ok(_) => {}
                    Err(e) => errors.push(format!(
                        "{}/{}: 无法读取源文件 {} - {e}",
                        kind.tag(),
                        name,
                        source.display()
                    )),
                }
            }
        }
    }

    if errors.is_empty() {
        println!("✅ 校验通过！共 {checked} 个资源");
        Ok(())
    } else {
        println!("❌ 校验失败！发现 {} 个问题:", errors.len());
        for error in &errors {
            println!("   - {error}");
        }
        bail!("{} 个资源有问题", errors.len())
    }
}
