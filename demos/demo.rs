//! 用于演示 `songlink-rs` 库的核心功能。
//!
//! ## 如何运行
//!
//! ```bash
//! cargo run --package songlink_rs --example demo -- https://open.spotify.com/track/0Jcij1eWd5bDMU5iPbxe2i
//! ```

use std::time::Duration;

use songlink_rs::{Songlink, SonglinkConfig, error::Result};

use tracing::{Level, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let uri = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://open.spotify.com/track/0Jcij1eWd5bDMU5iPbxe2i".to_string());

    // 优先使用用户配置目录中的配置文件，不存在时使用默认值。
    let mut config = SonglinkConfig::load_default()?;
    config.cache_duration = Duration::from_secs(600);
    info!("使用国家代码 {}，正在初始化...", config.country_code);
    let songlink = Songlink::new(config)?;

    info!("准备解析: {}", uri);
    let track = match songlink.resolve(&uri).await {
        Ok(track) => track,
        Err(e) => {
            error!("解析失败: {}", e);
            return Err(e);
        }
    };

    println!("Songlink 页面: {}", track.page_url);
    for platform_track in track.iter() {
        let title = platform_track.metadata.title.as_deref().unwrap_or("<未知>");
        let artist = platform_track
            .metadata
            .artist_name
            .as_deref()
            .unwrap_or("<未知>");
        println!(
            "  [{:<13}] {} - {}\n                  {}",
            platform_track.platform.to_string(),
            artist,
            title,
            platform_track.links.url
        );
    }

    if let Some(thumbnail) = track
        .iter()
        .find_map(|platform_track| platform_track.metadata.thumbnail.as_ref())
    {
        match songlink.load_thumbnail(thumbnail).await {
            Ok(_) => {
                if let Some(color) = thumbnail.average_color() {
                    println!("封面平均颜色: #{:02x}{:02x}{:02x}", color[0], color[1], color[2]);
                }
            }
            Err(e) => error!("加载封面失败: {}", e),
        }
    }

    // 第二次解析命中缓存，不会再次请求上游。
    let cached = songlink.resolve(&uri).await?;
    info!("缓存命中: {}", std::sync::Arc::ptr_eq(&track, &cached));

    Ok(())
}
