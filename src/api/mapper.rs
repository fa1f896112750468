//! 将 Songlink 的原始响应文档映射为强类型的 [`Track`]。
//!
//! 映射是全有或全无的：任何一个已知平台的条目出错都会中止整个映射，
//! 不会返回只填充了一部分平台的 `Track`。

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    api::models::{Entity, LinksResponse, PlatformLink},
    error::{Result, SonglinkError},
    model::{ApiProvider, EntityType, Links, Metadata, Platform, PlatformTrack, Thumbnail, Track},
};

/// 解析原始响应字节并映射为 `Track`。
///
/// # 错误
/// * 字节不是合法 JSON，或缺少必需字段时返回 `SonglinkError::MalformedResponse`。
/// * 出现无法识别的平台、提供商或实体类型时返回 `SonglinkError::UnrecognizedIdentifier`。
pub fn parse_response(bytes: &[u8]) -> Result<Track> {
    let document: Value = serde_json::from_slice(bytes)?;
    map_document(&document)
}

/// 将一个已解析的 JSON 文档映射为 `Track`。
pub fn map_document(document: &Value) -> Result<Track> {
    let response = LinksResponse::deserialize(document)
        .map_err(|e| SonglinkError::malformed(format!("顶层结构: {e}")))?;

    let platforms = map_platforms(&response).inspect_err(|e| {
        warn!(
            "[Songlink] 实体 '{}' 的响应映射失败: {}",
            response.entity_unique_id, e
        );
    })?;

    debug!(
        "[Songlink] 实体 '{}' 映射完成，共匹配到 {} 个平台。",
        response.entity_unique_id,
        platforms.len()
    );

    Ok(Track {
        entity_unique_id: response.entity_unique_id,
        user_country: response.user_country,
        page_url: response.page_url,
        platforms,
    })
}

fn map_platforms(response: &LinksResponse) -> Result<HashMap<Platform, PlatformTrack>> {
    let mut tracks = HashMap::new();

    for platform in Platform::iter() {
        let Some(raw_link) = response.links_by_platform.get(platform.identifier()) else {
            continue;
        };
        let platform_track = map_platform(platform, raw_link, &response.entities_by_unique_id)?;
        tracks.insert(platform, platform_track);
    }

    if tracks.len() < response.links_by_platform.len() {
        let ignored: Vec<&str> = response
            .links_by_platform
            .keys()
            .map(String::as_str)
            .filter(|key| !tracks.keys().any(|platform| platform.identifier() == *key))
            .collect();
        trace!("[Songlink] 忽略未知平台的链接条目: {:?}", ignored);
    }

    Ok(tracks)
}

fn map_platform(
    platform: Platform,
    raw_link: &Value,
    entities: &HashMap<String, Value>,
) -> Result<PlatformTrack> {
    let link = PlatformLink::deserialize(raw_link).map_err(|e| {
        SonglinkError::malformed(format!("linksByPlatform.{}: {e}", platform.identifier()))
    })?;

    let raw_entity = entities.get(&link.entity_unique_id).ok_or_else(|| {
        SonglinkError::malformed(format!(
            "linksByPlatform.{} 引用了不存在的实体 '{}'",
            platform.identifier(),
            link.entity_unique_id
        ))
    })?;
    let entity = Entity::deserialize(raw_entity).map_err(|e| {
        SonglinkError::malformed(format!(
            "entitiesByUniqueId.{}: {e}",
            link.entity_unique_id
        ))
    })?;

    let provider = ApiProvider::from_identifier(&entity.api_provider)?;
    let powered_by = powered_platforms(&entity.platforms)?;
    let metadata = to_metadata(&link, entity)?;

    Ok(PlatformTrack {
        platform,
        links: Links {
            url: link.url,
            mobile_deep_link: link.native_app_uri_mobile,
            desktop_deep_link: link.native_app_uri_desktop,
        },
        metadata,
        provider,
        powered_by,
    })
}

fn powered_platforms(raw: &[Value]) -> Result<Vec<Platform>> {
    raw.iter()
        .filter_map(Value::as_str)
        .map(Platform::from_identifier)
        .collect()
}

fn to_metadata(link: &PlatformLink, entity: Entity) -> Result<Metadata> {
    let country = link
        .country
        .clone()
        .or(entity.country)
        .ok_or_else(|| {
            SonglinkError::malformed(format!(
                "实体 '{}' 的链接与实体条目都缺少 country 字段",
                link.entity_unique_id
            ))
        })?;

    let entity_type = entity
        .entity_type
        .as_deref()
        .map(EntityType::from_identifier)
        .transpose()?;

    let thumbnail = match entity.thumbnail_url {
        Some(url) => {
            let (Some(width), Some(height)) = (entity.thumbnail_width, entity.thumbnail_height)
            else {
                return Err(SonglinkError::malformed(format!(
                    "实体 '{}' 有 thumbnailUrl 但缺少 thumbnailWidth/thumbnailHeight",
                    link.entity_unique_id
                )));
            };
            Some(Thumbnail::new(url, width, height))
        }
        None => None,
    };

    Ok(Metadata {
        id: link.entity_unique_id.clone(),
        country,
        entity_type,
        title: entity.title,
        artist_name: entity.artist_name,
        thumbnail,
    })
}
