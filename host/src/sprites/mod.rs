//! # Sprites 模块
//!
//! 精灵解码与按名缓存。
//!
//! ## 解码策略
//!
//! 按容器里记录的扩展名决定：png / webp 保留 alpha 通道（RGBA8），
//! 其余光栅格式丢弃 alpha（RGB8）。音频扩展名不经过这里，
//! 原始字节直接交给音频通道管理器。
//!
//! ## 缓存语义
//!
//! 每个精灵类别（character / object / background / dialog_sprite）一张
//! 名称到实例的表。普通请求命中时返回**同一个**实例，脚本反复引用同名
//! 精灵不会重复解码；带别名的请求总是构造全新实例，既不查缓存，
//! 也不写入任何缓存槽。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use story_runtime::ContentKind;

use crate::container::{FontSpriteProperties, StoryContainer};

/// 解码后的精灵
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    /// `has_alpha` 为真时是 RGBA8 排列，否则 RGB8
    pub pixels: Vec<u8>,
    pub has_alpha: bool,
}

/// 字模图集：切分属性 + 图集位图
#[derive(Debug, Clone)]
pub struct FontSheet {
    pub sprite: Arc<Sprite>,
    pub properties: FontSpriteProperties,
}

/// 扩展名是否属于保留 alpha 的图像格式
fn keeps_alpha(extension: &str) -> bool {
    matches!(extension.to_lowercase().as_str(), "png" | "webp")
}

/// 从原始字节解码精灵
fn decode(name: &str, bytes: &[u8], extension: &str) -> Option<Sprite> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(name, extension, "精灵解码失败: {e}");
            return None;
        }
    };

    if keeps_alpha(extension) {
        let rgba = decoded.to_rgba8();
        Some(Sprite {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
            has_alpha: true,
        })
    } else {
        let rgb = decoded.to_rgb8();
        Some(Sprite {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.into_raw(),
            has_alpha: false,
        })
    }
}

/// 精灵仓库
///
/// 生命周期与一次运行中的故事一致。
#[derive(Default)]
pub struct SpriteStore {
    caches: HashMap<ContentKind, HashMap<String, Arc<Sprite>>>,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 普通请求：命中缓存返回同一实例，未命中解码后写入缓存
    ///
    /// 只接受精灵类别；缺失资源或解码失败返回 `None`，是否致命由调用方决定。
    pub fn get(
        &mut self,
        container: &StoryContainer,
        kind: ContentKind,
        name: &str,
    ) -> Option<Arc<Sprite>> {
        if !kind.is_sprite() {
            return None;
        }

        if let Some(hit) = self.caches.get(&kind).and_then(|cache| cache.get(name)) {
            return Some(hit.clone());
        }

        let sprite = Arc::new(self.decode_asset(container, kind, name)?);
        self.caches
            .entry(kind)
            .or_default()
            .insert(name.to_string(), sprite.clone());
        Some(sprite)
    }

    /// 带别名请求：总是构造全新实例
    ///
    /// 不查缓存，也不把新实例写入原名或别名的任何缓存槽。
    pub fn get_fresh(
        &mut self,
        container: &StoryContainer,
        kind: ContentKind,
        name: &str,
    ) -> Option<Arc<Sprite>> {
        if !kind.is_sprite() {
            return None;
        }
        Some(Arc::new(self.decode_asset(container, kind, name)?))
    }

    /// 字模图集请求
    ///
    /// 必须有同名的 `font_properties` 伴生条目，否则返回 `None`。
    pub fn font_sheet(&self, container: &StoryContainer, name: &str) -> Option<FontSheet> {
        let properties = container.font_properties(name)?.clone();
        let bytes = container.asset_bytes(ContentKind::FontSheet, name)?;
        let extension = container.asset_extension(ContentKind::FontSheet, name)?;
        let sprite = decode(name, bytes, extension)?;
        Some(FontSheet {
            sprite: Arc::new(sprite),
            properties,
        })
    }

    /// 清空某一类别的缓存
    pub fn evict_kind(&mut self, kind: ContentKind) {
        self.caches.remove(&kind);
    }

    /// 某一类别的缓存条目数（诊断用）
    pub fn cached_count(&self, kind: ContentKind) -> usize {
        self.caches.get(&kind).map_or(0, HashMap::len)
    }

    fn decode_asset(
        &self,
        container: &StoryContainer,
        kind: ContentKind,
        name: &str,
    ) -> Option<Sprite> {
        let bytes = container.asset_bytes(kind, name)?;
        let extension = container.asset_extension(kind, name)?;
        decode(name, bytes, extension)
    }
}
