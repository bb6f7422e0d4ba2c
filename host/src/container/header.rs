//! # Container Header 模块
//!
//! 容器页脚与两段 JSON 头（DetailHeader / GeneralHeader）的类型定义。
//!
//! ## 页脚布局（定宽 50 字节）
//!
//! ```text
//! "{detailFrom}-{detailTo}" + '#' 填充到 25 字节
//! "{generalFrom}-{generalTo}" + '#' 填充到 25 字节
//! ```
//!
//! 模式不精确匹配即视为容器损坏。填充字符与字段宽度是固定分隔符，不是数据。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use story_runtime::ContentKind;

/// 页脚总宽度（字节）
pub const FOOTER_LEN: usize = 50;
/// 页脚单字段宽度（字节）
pub const FOOTER_FIELD_LEN: usize = 25;
/// 页脚填充字符
pub const FOOTER_PAD: u8 = b'#';

/// 字节区间 `[from, to)`
///
/// 不变量：`from <= to <= 容器长度`（容器加载时校验）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRange {
    pub from: usize,
    pub to: usize,
}

impl AssetRange {
    /// 从 `"from-to"` 文本解析
    ///
    /// 两侧必须是纯十进制数字，且 `from <= to`。
    pub fn parse(text: &str) -> Option<Self> {
        let (from, to) = text.split_once('-')?;
        let from = parse_decimal(from)?;
        let to = parse_decimal(to)?;
        (from <= to).then_some(Self { from, to })
    }

    /// 编码回 `"from-to"` 文本（打包器使用同一格式）
    pub fn encode(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

fn parse_decimal(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// 解析 50 字节页脚
///
/// 返回 `(DetailHeader 区间, GeneralHeader 区间)`；模式不匹配返回 `None`。
pub fn parse_footer(bytes: &[u8]) -> Option<(AssetRange, AssetRange)> {
    if bytes.len() != FOOTER_LEN {
        return None;
    }
    let detail = parse_footer_field(&bytes[..FOOTER_FIELD_LEN])?;
    let general = parse_footer_field(&bytes[FOOTER_FIELD_LEN..])?;
    Some((detail, general))
}

/// 解析单个定宽字段：`"from-to"` + 纯 `#` 填充
fn parse_footer_field(field: &[u8]) -> Option<AssetRange> {
    let text = std::str::from_utf8(field).ok()?;
    let data_len = text
        .bytes()
        .position(|b| b == FOOTER_PAD)
        .unwrap_or(text.len());
    let (data, pad) = text.split_at(data_len);
    if !pad.bytes().all(|b| b == FOOTER_PAD) {
        return None;
    }
    AssetRange::parse(data)
}

/// 编码 50 字节页脚
///
/// 区间文本超过字段宽度时返回 `None`（实际容器不可能触发）。
pub fn encode_footer(detail: &AssetRange, general: &AssetRange) -> Option<[u8; FOOTER_LEN]> {
    let mut footer = [FOOTER_PAD; FOOTER_LEN];
    for (slot, range) in [(0, detail), (1, general)] {
        let text = range.encode();
        if text.len() > FOOTER_FIELD_LEN {
            return None;
        }
        let start = slot * FOOTER_FIELD_LEN;
        footer[start..start + text.len()].copy_from_slice(text.as_bytes());
    }
    Some(footer)
}

/// 单个资源条目：`["from-to", "扩展名"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry(pub String, pub String);

impl AssetEntry {
    pub fn new(range: &AssetRange, extension: impl Into<String>) -> Self {
        Self(range.encode(), extension.into())
    }

    /// 区间文本 `"from-to"`
    pub fn range_str(&self) -> &str {
        &self.0
    }

    /// 文件扩展名（不含点）
    pub fn extension(&self) -> &str {
        &self.1
    }
}

/// 字模图集属性
///
/// 字模按固定网格切分；`charset` 按行优先顺序列出每个格子的字符。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpriteProperties {
    pub glyph_width: u32,
    pub glyph_height: u32,
    #[serde(default)]
    pub padding: u32,
    #[serde(default)]
    pub charset: String,
}

/// 容器的逐资源索引头
///
/// 分类键是固定字符串标签，每类资源一个；
/// 字模图集额外携带 `font_properties` 伴生条目。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailHeader {
    #[serde(default)]
    pub character: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub object: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub background: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub font_sheet: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub dialog_sprite: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub audio: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub music: HashMap<String, AssetEntry>,
    #[serde(default)]
    pub font_properties: HashMap<String, FontSpriteProperties>,
}

impl DetailHeader {
    /// 按类别取资源表
    pub fn section(&self, kind: ContentKind) -> &HashMap<String, AssetEntry> {
        match kind {
            ContentKind::Character => &self.character,
            ContentKind::Object => &self.object,
            ContentKind::Background => &self.background,
            ContentKind::FontSheet => &self.font_sheet,
            ContentKind::DialogSprite => &self.dialog_sprite,
            ContentKind::Audio => &self.audio,
            ContentKind::Music => &self.music,
        }
    }

    pub fn section_mut(&mut self, kind: ContentKind) -> &mut HashMap<String, AssetEntry> {
        match kind {
            ContentKind::Character => &mut self.character,
            ContentKind::Object => &mut self.object,
            ContentKind::Background => &mut self.background,
            ContentKind::FontSheet => &mut self.font_sheet,
            ContentKind::DialogSprite => &mut self.dialog_sprite,
            ContentKind::Audio => &mut self.audio,
            ContentKind::Music => &mut self.music,
        }
    }
}

/// 故事级元数据头
///
/// 加载后只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralHeader {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default)]
    pub start_script: String,
    #[serde(default)]
    pub version: String,
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for GeneralHeader {
    fn default() -> Self {
        Self {
            title: String::new(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            start_script: String::new(),
            version: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_range_parse() {
        assert_eq!(AssetRange::parse("0-100"), Some(AssetRange { from: 0, to: 100 }));
        assert_eq!(AssetRange::parse("5-5"), Some(AssetRange { from: 5, to: 5 }));
        assert_eq!(AssetRange::parse("100-5"), None);
        assert_eq!(AssetRange::parse("-5"), None);
        assert_eq!(AssetRange::parse("5-"), None);
        assert_eq!(AssetRange::parse("a-b"), None);
        assert_eq!(AssetRange::parse("1.5-2"), None);
        assert_eq!(AssetRange::parse("12"), None);
    }

    #[test]
    fn test_footer_round_trip() {
        let detail = AssetRange { from: 1024, to: 2048 };
        let general = AssetRange {
            from: 2048,
            to: 2100,
        };

        let footer = encode_footer(&detail, &general).unwrap();
        assert_eq!(footer.len(), FOOTER_LEN);
        assert_eq!(parse_footer(&footer), Some((detail, general)));
    }

    #[test]
    fn test_footer_pad_is_fixed_filler() {
        let footer = encode_footer(
            &AssetRange { from: 0, to: 9 },
            &AssetRange { from: 9, to: 10 },
        )
        .unwrap();

        // 字段内容之后必须全是填充字符
        assert_eq!(&footer[..3], b"0-9");
        assert!(footer[3..FOOTER_FIELD_LEN].iter().all(|&b| b == FOOTER_PAD));
        assert_eq!(&footer[FOOTER_FIELD_LEN..FOOTER_FIELD_LEN + 4], b"9-10");
    }

    #[test]
    fn test_footer_rejects_bad_patterns() {
        // 长度不对
        assert_eq!(parse_footer(b"0-9"), None);

        // 填充中混入数据
        let mut footer = encode_footer(
            &AssetRange { from: 0, to: 9 },
            &AssetRange { from: 9, to: 10 },
        )
        .unwrap();
        footer[10] = b'7';
        assert_eq!(parse_footer(&footer), None);

        // 字段不是 from-to 形式
        let mut footer = [FOOTER_PAD; FOOTER_LEN];
        footer[..5].copy_from_slice(b"HELLO");
        assert_eq!(parse_footer(&footer), None);

        // 全填充（没有数据）
        assert_eq!(parse_footer(&[FOOTER_PAD; FOOTER_LEN]), None);
    }

    #[test]
    fn test_asset_entry_shape() {
        let entry = AssetEntry::new(&AssetRange { from: 10, to: 20 }, "png");
        assert_eq!(entry.range_str(), "10-20");
        assert_eq!(entry.extension(), "png");

        // 序列化为二元数组
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"["10-20","png"]"#);
        let back: AssetEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_detail_header_sections() {
        let json = r#"{
            "character": { "hero": ["0-10", "png"] },
            "music": { "town": ["10-20", "ogg"] },
            "font_properties": { "main": { "glyph_width": 16, "glyph_height": 24 } }
        }"#;
        let header: DetailHeader = serde_json::from_str(json).unwrap();

        assert_eq!(
            header.section(ContentKind::Character).get("hero"),
            Some(&AssetEntry("0-10".to_string(), "png".to_string()))
        );
        assert!(header.section(ContentKind::Object).is_empty());
        assert_eq!(header.font_properties["main"].glyph_width, 16);
        assert_eq!(header.font_properties["main"].padding, 0);
    }

    #[test]
    fn test_general_header_defaults() {
        let header: GeneralHeader = serde_json::from_str("{}").unwrap();
        assert_eq!(header.window_width, 1280);
        assert_eq!(header.window_height, 720);
        assert!(header.title.is_empty());
    }
}
