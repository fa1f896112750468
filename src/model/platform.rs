//! 定义了 Songlink 响应中出现的封闭标识符集合：平台、API 提供商与实体类型。
//!
//! 每个变体都对应一个固定的外部标识符字符串。反向查找是全函数：
//! 集合之外的字符串一律返回 [`SonglinkError::UnrecognizedIdentifier`]，
//! 不会被静默忽略，也不会回落到某个默认值。

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{IdentifierKind, Result, SonglinkError};

/// 为标识符枚举生成统一的查找接口。
macro_rules! identifier_enum {
    ($ty:ident, $kind:expr) => {
        impl $ty {
            /// 返回该变体在 Songlink API 中使用的外部标识符。
            pub fn identifier(self) -> &'static str {
                self.into()
            }

            /// 根据外部标识符查找变体。
            ///
            /// # 错误
            /// 标识符不属于固定集合时返回 `SonglinkError::UnrecognizedIdentifier`。
            pub fn from_identifier(identifier: &str) -> Result<Self> {
                identifier
                    .parse()
                    .map_err(|_| SonglinkError::unrecognized($kind, identifier))
            }

            /// 按声明顺序遍历所有变体。
            ///
            /// 固有方法，无需引入 `strum::IntoEnumIterator`。
            pub fn iter() -> impl Iterator<Item = Self> {
                <Self as IntoEnumIterator>::iter()
            }
        }

        impl TryFrom<String> for $ty {
            type Error = SonglinkError;

            fn try_from(value: String) -> Result<Self> {
                Self::from_identifier(&value)
            }
        }
    };
}

/// 面向用户的音乐/媒体平台。
///
/// 变体的声明顺序即映射响应时遍历平台的顺序。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Platform {
    /// Spotify
    #[strum(serialize = "spotify")]
    Spotify,
    /// iTunes 商店
    #[strum(serialize = "itunes")]
    Itunes,
    /// Apple Music
    #[strum(serialize = "appleMusic")]
    AppleMusic,
    /// YouTube
    #[strum(serialize = "youtube")]
    Youtube,
    /// YouTube Music
    #[strum(serialize = "youtubeMusic")]
    YoutubeMusic,
    /// Google Play Music
    #[strum(serialize = "google")]
    Google,
    /// Google Play 商店
    #[strum(serialize = "googleStore")]
    GoogleStore,
    /// Pandora
    #[strum(serialize = "pandora")]
    Pandora,
    /// Deezer
    #[strum(serialize = "deezer")]
    Deezer,
    /// Tidal
    #[strum(serialize = "tidal")]
    Tidal,
    /// Amazon 商店
    #[strum(serialize = "amazonStore")]
    AmazonStore,
    /// Amazon Music
    #[strum(serialize = "amazonMusic")]
    AmazonMusic,
    /// SoundCloud
    #[strum(serialize = "soundcloud")]
    Soundcloud,
    /// Napster
    #[strum(serialize = "napster")]
    Napster,
    /// Yandex Music
    #[strum(serialize = "yandex")]
    Yandex,
    /// Spinrilla
    #[strum(serialize = "spinrilla")]
    Spinrilla,
    /// Audius
    ///
    /// 早期的 Java 版本把它也映射到了 `"yandex"`，导致反向查找永远落到
    /// [`Platform::Yandex`]。这里使用上游真实的键 `"audius"`：
    /// 依赖旧行为（用 Audius 去读 Yandex 的条目）的调用方会看到不同的结果。
    #[strum(serialize = "audius")]
    Audius,
    /// Audiomack
    #[strum(serialize = "audiomack")]
    Audiomack,
}

identifier_enum!(Platform, IdentifierKind::Platform);

/// 实际为某个平台提供元数据的后端目录服务。
///
/// 一个提供商可以支撑多个平台，例如 iTunes 同时支撑商店与 Apple Music。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ApiProvider {
    /// Spotify
    #[strum(serialize = "spotify")]
    Spotify,
    /// iTunes
    #[strum(serialize = "itunes")]
    Itunes,
    /// YouTube
    #[strum(serialize = "youtube")]
    Youtube,
    /// Google
    #[strum(serialize = "google")]
    Google,
    /// Pandora
    #[strum(serialize = "pandora")]
    Pandora,
    /// Deezer
    #[strum(serialize = "deezer")]
    Deezer,
    /// Tidal
    #[strum(serialize = "tidal")]
    Tidal,
    /// Amazon
    #[strum(serialize = "amazon")]
    Amazon,
    /// SoundCloud
    #[strum(serialize = "soundcloud")]
    Soundcloud,
    /// Napster
    #[strum(serialize = "napster")]
    Napster,
    /// Yandex
    #[strum(serialize = "yandex")]
    Yandex,
    /// Spinrilla
    #[strum(serialize = "spinrilla")]
    Spinrilla,
    /// Audius
    #[strum(serialize = "audius")]
    Audius,
    /// Audiomack
    #[strum(serialize = "audiomack")]
    Audiomack,
}

identifier_enum!(ApiProvider, IdentifierKind::ApiProvider);

/// 上游实体的类型。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum EntityType {
    /// 单曲
    #[strum(serialize = "song")]
    Song,
    /// 专辑
    #[strum(serialize = "album")]
    Album,
}

identifier_enum!(EntityType, IdentifierKind::EntityType);
