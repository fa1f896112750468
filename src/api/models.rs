//! 此模块定义了用于反序列化 Songlink `/links` 接口响应的数据结构。
//!
//! 标识符字段保留为原始字符串，由映射器转换为枚举，
//! 以便区分“字段缺失”与“标识符无法识别”两类错误。

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// `/links` 接口响应的顶层结构。
///
/// 两张表的值保持为未解析的 JSON：只有被已知平台引用到的条目才会被解析。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksResponse {
    /// 输入链接对应实体的唯一 ID。
    pub entity_unique_id: String,
    /// 请求时使用的国家/地区代码。
    pub user_country: String,
    /// Songlink 聚合页面地址。
    pub page_url: String,
    /// 以实体唯一 ID 为键的实体表。
    pub entities_by_unique_id: HashMap<String, Value>,
    /// 以平台标识符为键的链接表。
    pub links_by_platform: HashMap<String, Value>,
}

/// `linksByPlatform` 中的一个条目。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformLink {
    /// 网页链接。
    pub url: String,
    /// 移动端原生应用链接。
    pub native_app_uri_mobile: Option<String>,
    /// 桌面端原生应用链接。
    pub native_app_uri_desktop: Option<String>,
    /// 指向 `entitiesByUniqueId` 的外键。
    pub entity_unique_id: String,
    /// 国家/地区代码。
    pub country: Option<String>,
}

/// `entitiesByUniqueId` 中的一个条目。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// 实体在提供商平台上的 ID。
    pub id: Option<String>,
    /// 实体类型，`song` 或 `album`。
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    /// 标题。
    pub title: Option<String>,
    /// 艺术家名。
    pub artist_name: Option<String>,
    /// 缩略图地址。
    pub thumbnail_url: Option<String>,
    /// 缩略图宽度。
    pub thumbnail_width: Option<u32>,
    /// 缩略图高度。
    pub thumbnail_height: Option<u32>,
    /// 提供该实体的 API 提供商标识符。
    pub api_provider: String,
    /// 由该实体支撑的平台标识符。非字符串的元素会被跳过。
    pub platforms: Vec<Value>,
    /// 国家/地区代码。
    pub country: Option<String>,
}
