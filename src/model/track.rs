//! 定义了解析结果的核心数据结构：链接、元数据、单平台视图与跨平台的 `Track`。
//!
//! 这些结构在映射时一次性构造，之后不再修改。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    platform::{ApiProvider, EntityType, Platform},
    thumbnail::Thumbnail,
};

/// 某个平台上的链接集合。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    /// 网页链接。
    pub url: String,
    /// 移动端原生应用的深链接。
    pub mobile_deep_link: Option<String>,
    /// 桌面端原生应用的深链接。
    pub desktop_deep_link: Option<String>,
}

/// 上游某个实体的描述性元数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// 实体在 Songlink 中的唯一 ID，例如 `SPOTIFY_SONG::0Jcij1eWd5bDMU5iPbxe2i`。
    pub id: String,
    /// 实体所属的国家/地区代码。
    pub country: String,
    /// 实体类型。
    pub entity_type: Option<EntityType>,
    /// 标题。
    pub title: Option<String>,
    /// 艺术家名。
    pub artist_name: Option<String>,
    /// 缩略图。
    pub thumbnail: Option<Thumbnail>,
}

/// 某一个平台上看到的解析结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTrack {
    /// 所在平台。
    pub platform: Platform,
    /// 该平台上的链接。
    pub links: Links,
    /// 该平台对应实体的元数据。
    pub metadata: Metadata,
    /// 实际提供元数据的后端。
    pub provider: ApiProvider,
    /// 共享同一个实体的所有平台，保持响应中的顺序。
    pub powered_by: Vec<Platform>,
}

/// 一次解析的根结果：同一首歌/专辑在所有已匹配平台上的表示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// 输入链接对应实体的唯一 ID。
    pub entity_unique_id: String,
    /// 请求时使用的国家/地区代码。
    pub user_country: String,
    /// Songlink 的聚合页面地址。
    pub page_url: String,
    /// 每个平台至多一个条目。
    pub platforms: HashMap<Platform, PlatformTrack>,
}

impl Track {
    /// 获取指定平台上的结果。
    ///
    /// 上游不一定能在每个平台上都找到匹配，缺失时返回 `None`。
    pub fn platform(&self, platform: Platform) -> Option<&PlatformTrack> {
        self.platforms.get(&platform)
    }

    /// 是否包含指定平台。
    pub fn contains(&self, platform: Platform) -> bool {
        self.platforms.contains_key(&platform)
    }

    /// 按 [`Platform`] 的声明顺序遍历所有平台结果。
    pub fn iter(&self) -> impl Iterator<Item = &PlatformTrack> {
        Platform::iter().filter_map(|platform| self.platforms.get(&platform))
    }

    /// 匹配到的平台数量。
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// 是否一个平台都没有匹配到。
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
