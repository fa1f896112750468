//! 领域模型：平台与提供商枚举、链接、元数据以及解析得到的 `Track`。

pub mod platform;
pub mod thumbnail;
pub mod track;

pub use platform::{ApiProvider, EntityType, Platform};
pub use thumbnail::Thumbnail;
pub use track::{Links, Metadata, PlatformTrack, Track};
