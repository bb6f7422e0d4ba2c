//! # Container 模块
//!
//! 编译后的故事容器（`.story` 文件）读取器。
//!
//! ## 文件布局
//!
//! ```text
//! [资源字节 ...][DetailHeader JSON][GeneralHeader JSON][50 字节页脚]
//! ```
//!
//! 页脚定位两段 JSON 头；DetailHeader 给出每个资源在容器内的字节区间，
//! 资源按区间直接从初始加载的缓冲上切片，不做第二次整体复制。

pub mod header;

pub use header::{
    AssetEntry, AssetRange, DetailHeader, FOOTER_LEN, FontSpriteProperties, GeneralHeader,
};

use std::path::Path;

use thiserror::Error;

use story_runtime::ContentKind;

use header::parse_footer;

/// 容器加载错误
///
/// 对启动故事而言都是致命错误：向宿主传播，内部不重试。
#[derive(Error, Debug)]
pub enum ContainerError {
    /// 文件不存在
    #[error("故事容器不存在: {path}")]
    NotFound { path: String },

    /// 路径存在但不是文件
    #[error("路径不是文件: {path}")]
    NotAFile { path: String },

    /// 页脚、JSON 头或资源区间损坏
    #[error("故事容器损坏: {message}")]
    Corrupt { message: String },
}

fn corrupt(message: impl Into<String>) -> ContainerError {
    ContainerError::Corrupt {
        message: message.into(),
    }
}

/// 已加载的故事容器
///
/// 加载后不可变，持有全部资源字节直到故事结束。
#[derive(Debug)]
pub struct StoryContainer {
    bytes: Vec<u8>,
    detail: DetailHeader,
    general: GeneralHeader,
}

impl StoryContainer {
    /// 从文件加载容器
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ContainerError::NotFound {
                path: path.display().to_string(),
            });
        }
        if !path.is_file() {
            return Err(ContainerError::NotAFile {
                path: path.display().to_string(),
            });
        }

        let bytes = std::fs::read(path).map_err(|e| corrupt(format!("读取失败: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// 从内存字节解析容器
    ///
    /// 加载时校验页脚、两段头的次序与全部资源区间；
    /// 之后 [`Self::asset_bytes`] 的切片不再可能失败。
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContainerError> {
        if bytes.len() < FOOTER_LEN {
            return Err(corrupt(format!(
                "容器只有 {} 字节，不足以容纳页脚",
                bytes.len()
            )));
        }

        let footer_at = bytes.len() - FOOTER_LEN;
        let (detail_range, general_range) =
            parse_footer(&bytes[footer_at..]).ok_or_else(|| corrupt("页脚模式不匹配"))?;

        // 两段头依次排在资源区之后、页脚之前
        let ordered = detail_range.from < detail_range.to
            && detail_range.to <= general_range.from
            && general_range.from < general_range.to
            && general_range.to <= footer_at;
        if !ordered {
            return Err(corrupt(format!(
                "头区间越界或次序错误: {} / {}",
                detail_range.encode(),
                general_range.encode()
            )));
        }

        let detail: DetailHeader =
            serde_json::from_slice(&bytes[detail_range.from..detail_range.to])
                .map_err(|e| corrupt(format!("DetailHeader 无法解析: {e}")))?;
        let general: GeneralHeader =
            serde_json::from_slice(&bytes[general_range.from..general_range.to])
                .map_err(|e| corrupt(format!("GeneralHeader 无法解析: {e}")))?;

        for kind in ContentKind::ALL {
            for (name, entry) in detail.section(kind) {
                AssetRange::parse(entry.range_str())
                    .filter(|range| range.to <= bytes.len())
                    .ok_or_else(|| {
                        corrupt(format!(
                            "资源 {}/{} 的区间 '{}' 非法",
                            kind.tag(),
                            name,
                            entry.range_str()
                        ))
                    })?;
            }
        }

        Ok(Self {
            bytes,
            detail,
            general,
        })
    }

    /// 按类别与名称取资源字节
    ///
    /// 返回容器缓冲中 `[from, to)` 的精确切片；未知名称返回 `None`。
    pub fn asset_bytes(&self, kind: ContentKind, name: &str) -> Option<&[u8]> {
        let entry = self.detail.section(kind).get(name)?;
        // 区间在加载时已校验过
        let range = AssetRange::parse(entry.range_str())?;
        Some(&self.bytes[range.from..range.to])
    }

    /// 资源的文件扩展名（不含点）
    pub fn asset_extension(&self, kind: ContentKind, name: &str) -> Option<&str> {
        Some(self.detail.section(kind).get(name)?.extension())
    }

    /// 字模图集的伴生属性
    pub fn font_properties(&self, name: &str) -> Option<&FontSpriteProperties> {
        self.detail.font_properties.get(name)
    }

    pub fn detail(&self) -> &DetailHeader {
        &self.detail
    }

    pub fn general(&self) -> &GeneralHeader {
        &self.general
    }

    /// 容器总字节数
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::build_container;
    use super::*;
    use std::io::Write;

    fn sample() -> Vec<u8> {
        build_container(
            &[
                (ContentKind::Character, "hero", "png", b"HERO-PNG"),
                (ContentKind::Music, "town", "ogg", b"TOWN-OGG-BYTES"),
                (ContentKind::Audio, "door", "wav", b"DOOR"),
            ],
            &GeneralHeader {
                title: "風の物語".to_string(),
                ..GeneralHeader::default()
            },
        )
    }

    #[test]
    fn test_asset_round_trip() {
        let container = StoryContainer::from_bytes(sample()).unwrap();

        // 精确切片：内容与长度都与打包时一致
        let bytes = container
            .asset_bytes(ContentKind::Music, "town")
            .unwrap();
        assert_eq!(bytes, b"TOWN-OGG-BYTES");
        assert_eq!(bytes.len(), "TOWN-OGG-BYTES".len());

        assert_eq!(
            container.asset_bytes(ContentKind::Character, "hero"),
            Some(&b"HERO-PNG"[..])
        );
        assert_eq!(
            container.asset_extension(ContentKind::Audio, "door"),
            Some("wav")
        );
    }

    #[test]
    fn test_missing_asset_is_none() {
        let container = StoryContainer::from_bytes(sample()).unwrap();
        assert_eq!(container.asset_bytes(ContentKind::Character, "nobody"), None);
        // 类别不符也查不到
        assert_eq!(container.asset_bytes(ContentKind::Object, "hero"), None);
    }

    #[test]
    fn test_reparse_yields_identical_headers() {
        let bytes = sample();
        let first = StoryContainer::from_bytes(bytes.clone()).unwrap();
        let second = StoryContainer::from_bytes(bytes).unwrap();

        assert_eq!(first.detail(), second.detail());
        assert_eq!(first.general(), second.general());
        assert_eq!(first.general().title, "風の物語");
    }

    #[test]
    fn test_header_ranges_ordered() {
        let bytes = sample();
        let footer = &bytes[bytes.len() - FOOTER_LEN..];
        let (detail, general) = header::parse_footer(footer).unwrap();

        assert!(detail.from < detail.to);
        assert!(detail.to <= general.from);
        assert!(general.from < general.to);
        assert!(general.to <= bytes.len());
    }

    #[test]
    fn test_truncated_container_is_corrupt() {
        assert!(matches!(
            StoryContainer::from_bytes(vec![0; 10]),
            Err(ContainerError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_bad_footer_is_corrupt() {
        let mut bytes = sample();
        let at = bytes.len() - 1;
        bytes[at] = b'X';
        assert!(matches!(
            StoryContainer::from_bytes(bytes),
            Err(ContainerError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_bad_header_json_is_corrupt() {
        let mut bytes = sample();
        // DetailHeader JSON 的第一个字节在资源区之后
        let footer = &bytes[bytes.len() - FOOTER_LEN..];
        let (detail, _) = header::parse_footer(footer).unwrap();
        bytes[detail.from] = b'!';
        assert!(matches!(
            StoryContainer::from_bytes(bytes),
            Err(ContainerError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_out_of_range_asset_is_corrupt() {
        let bytes = testutil::build_container_with_detail(
            &[],
            &GeneralHeader::default(),
            |detail| {
                detail.character.insert(
                    "ghost".to_string(),
                    AssetEntry("0-99999".to_string(), "png".to_string()),
                );
            },
        );
        assert!(matches!(
            StoryContainer::from_bytes(bytes),
            Err(ContainerError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.story");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&sample()).unwrap();
        drop(file);

        let container = StoryContainer::load(&path).unwrap();
        assert_eq!(
            container.asset_bytes(ContentKind::Character, "hero"),
            Some(&b"HERO-PNG"[..])
        );
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StoryContainer::load(dir.path().join("nope.story")),
            Err(ContainerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StoryContainer::load(dir.path()),
            Err(ContainerError::NotAFile { .. })
        ));
    }
}
