//! 此模块封装了 Songlink (Odesli) `/links` 接口的请求构造与响应映射。
//!
//! 接口文档见 <https://www.notion.so/API-d0ebe08a5e304a55928405eb682f6741>。
//! 使用时请自行遵守 Songlink 的服务条款与署名要求。

pub mod mapper;
pub mod models;

use crate::error::{Result, SonglinkError};

/// Songlink `/links` 接口的默认地址。
pub const DEFAULT_ENDPOINT: &str = "https://api.song.link/v1-alpha.1/links";

/// 规范化用户输入的链接，得到缓存键。
///
/// 去掉首尾空白后按 URL 编码规则进行百分号编码。
///
/// # 错误
/// 输入为空（或只有空白）时返回 `SonglinkError::InvalidInput`。
pub fn normalize_uri(uri: &str) -> Result<String> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(SonglinkError::InvalidInput("待解析的链接为空".to_string()));
    }
    Ok(urlencoding::encode(trimmed).into_owned())
}

/// 构造上游请求地址。
///
/// 格式为 `<endpoint>?url=<已编码链接>&userCountry=<国家代码>`，
/// 配置了 API key 时追加 `&key=<key>`。
pub fn build_request_url(
    endpoint: &str,
    encoded_uri: &str,
    country_code: &str,
    api_key: Option<&str>,
) -> String {
    let mut url = format!("{endpoint}?url={encoded_uri}&userCountry={country_code}");
    if let Some(key) = api_key {
        url.push_str("&key=");
        url.push_str(&urlencoding::encode(key));
    }
    url
}
