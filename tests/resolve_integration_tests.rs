use std::{
    io::Cursor,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, Rgba, RgbaImage};
use parking_lot::Mutex;
use songlink_rs::{
    ApiProvider, EntityType, IdentifierKind, Platform, Result, Songlink, SonglinkError, Transport,
};

const ENDPOINT: &str = "https://mock.songlink.test/links";
const SPOTIFY_URI: &str = "https://open.spotify.com/track/0Jcij1eWd5bDMU5iPbxe2i";

type Responder = Box<dyn Fn(&str) -> Result<Vec<u8>> + Send + Sync>;

struct MockState {
    responder: Responder,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
}

/// 不访问网络的传输实现，记录每一次请求。
#[derive(Clone)]
struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    fn new(responder: impl Fn(&str) -> Result<Vec<u8>> + Send + Sync + 'static) -> Self {
        Self::with_delay(Duration::ZERO, responder)
    }

    fn with_delay(
        delay: Duration,
        responder: impl Fn(&str) -> Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(MockState {
                responder: Box::new(responder),
                delay,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    fn serving(body: Vec<u8>) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.state.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .requests
            .lock()
            .push((url.to_string(), user_agent.to_string()));
        if !self.state.delay.is_zero() {
            tokio::time::sleep(self.state.delay).await;
        }
        (self.state.responder)(url)
    }
}

fn load_test_data(filename: &str) -> Vec<u8> {
    let path = Path::new("tests/test_data").join(filename);
    std::fs::read(&path).unwrap_or_else(|e| panic!("读取测试文件 '{:?}' 失败: {}", path, e))
}

fn songlink_with(transport: MockTransport) -> Songlink {
    Songlink::builder()
        .endpoint(ENDPOINT)
        .user_agent("songlink-rs-tests")
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_resolve_full_response() {
    let transport = MockTransport::serving(load_test_data("spotify_song.json"));
    let songlink = songlink_with(transport.clone());

    let track = songlink.resolve(SPOTIFY_URI).await.unwrap();

    assert_eq!(track.entity_unique_id, "SPOTIFY_SONG::0Jcij1eWd5bDMU5iPbxe2i");
    assert_eq!(track.user_country, "US");
    assert_eq!(track.page_url, "https://song.link/s/0Jcij1eWd5bDMU5iPbxe2i");

    let platforms: Vec<Platform> = track.iter().map(|p| p.platform).collect();
    assert_eq!(
        platforms,
        vec![
            Platform::Spotify,
            Platform::Itunes,
            Platform::AppleMusic,
            Platform::Youtube,
            Platform::YoutubeMusic,
            Platform::Audius,
        ],
        "未知平台 'boomplay' 应被忽略"
    );

    let spotify = track.platform(Platform::Spotify).unwrap();
    assert_eq!(spotify.links.url, SPOTIFY_URI);
    assert_eq!(
        spotify.links.desktop_deep_link.as_deref(),
        Some("spotify:track:0Jcij1eWd5bDMU5iPbxe2i")
    );
    assert_eq!(spotify.metadata.title.as_deref(), Some("Kitchen"));
    assert_eq!(spotify.metadata.entity_type, Some(EntityType::Song));

    let youtube_music = track.platform(Platform::YoutubeMusic).unwrap();
    assert_eq!(youtube_music.provider, ApiProvider::Youtube);
    assert_eq!(
        youtube_music.powered_by,
        vec![Platform::Youtube, Platform::YoutubeMusic]
    );
    assert_eq!(youtube_music.metadata.id, "YOUTUBE_VIDEO::zGsCMgbRSuk");

    let audius = track.platform(Platform::Audius).unwrap();
    assert_eq!(audius.provider, ApiProvider::Audius);
    assert!(audius.metadata.thumbnail.is_none());
    assert!(!track.contains(Platform::Yandex));

    assert_eq!(
        transport.requests(),
        vec![(
            format!(
                "{ENDPOINT}?url=https%3A%2F%2Fopen.spotify.com%2Ftrack%2F0Jcij1eWd5bDMU5iPbxe2i&userCountry=US"
            ),
            "songlink-rs-tests".to_string()
        )]
    );
}

#[tokio::test]
async fn test_minimal_spotify_scenario() {
    let body = serde_json::json!({
        "entityUniqueId": "SPOTIFY_1",
        "userCountry": "US",
        "pageUrl": "https://song.link/s/1",
        "entitiesByUniqueId": {
            "SPOTIFY_1": { "country": "US", "apiProvider": "spotify", "platforms": ["spotify"] }
        },
        "linksByPlatform": {
            "spotify": {
                "url": "https://open.spotify.com/track/1",
                "entityUniqueId": "SPOTIFY_1",
                "country": "US"
            }
        }
    });
    let songlink = songlink_with(MockTransport::serving(body.to_string().into_bytes()));

    let track = songlink
        .resolve("https://open.spotify.com/track/1")
        .await
        .unwrap();

    assert_eq!(track.len(), 1);
    let spotify = track.platform(Platform::Spotify).unwrap();
    assert_eq!(spotify.links.url, "https://open.spotify.com/track/1");
    assert_eq!(spotify.provider, ApiProvider::Spotify);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_hit_upstream_once() {
    let body = load_test_data("spotify_song.json");
    let transport = MockTransport::with_delay(Duration::from_millis(150), move |_| Ok(body.clone()));
    let songlink = songlink_with(transport.clone());

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let songlink = songlink.clone();
            // 首尾空白不影响缓存键
            let uri = if i % 2 == 0 {
                SPOTIFY_URI.to_string()
            } else {
                format!("  {SPOTIFY_URI}\n")
            };
            tokio::spawn(async move { songlink.resolve(&uri).await })
        })
        .collect();

    let mut tracks = Vec::new();
    for task in tasks {
        tracks.push(task.await.unwrap().unwrap());
    }

    assert_eq!(transport.calls(), 1, "并发请求应合并为一次上游调用");
    assert!(tracks.iter().all(|t| Arc::ptr_eq(t, &tracks[0])));
    assert_eq!(songlink.cached_len(), 1);
}

#[tokio::test]
async fn test_cache_expiry_triggers_fresh_request() {
    let transport = MockTransport::serving(load_test_data("spotify_song.json"));
    let songlink = Songlink::builder()
        .endpoint(ENDPOINT)
        .cache_duration(Duration::from_secs(1))
        .transport(transport.clone())
        .build()
        .unwrap();

    songlink.resolve(SPOTIFY_URI).await.unwrap();
    songlink.resolve(SPOTIFY_URI).await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    songlink.resolve(SPOTIFY_URI).await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_unrecognized_identifier_is_not_cached() {
    let mut document: serde_json::Value =
        serde_json::from_slice(&load_test_data("spotify_song.json")).unwrap();
    document["entitiesByUniqueId"]["ITUNES_SONG::1443109064"]["apiProvider"] =
        serde_json::json!("applemusic-v2");
    let transport = MockTransport::serving(document.to_string().into_bytes());
    let songlink = songlink_with(transport.clone());

    for _ in 0..2 {
        let err = songlink.resolve(SPOTIFY_URI).await.unwrap_err();
        assert!(matches!(
            err,
            SonglinkError::UnrecognizedIdentifier {
                kind: IdentifierKind::ApiProvider,
                ref identifier,
            } if identifier == "applemusic-v2"
        ));
    }
    assert_eq!(transport.calls(), 2, "失败不应被缓存");
    assert_eq!(songlink.cached_len(), 0);
}

#[tokio::test]
async fn test_transport_error_is_surfaced_as_is() {
    let transport = MockTransport::new(|_| {
        Err(SonglinkError::Transport("HTTP 429 Too Many Requests".to_string()))
    });
    let songlink = songlink_with(transport.clone());

    let err = songlink.resolve(SPOTIFY_URI).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(transport.calls(), 1, "核心不应自动重试");
}

#[tokio::test]
async fn test_empty_input_is_rejected_without_request() {
    let transport = MockTransport::serving(Vec::new());
    let songlink = songlink_with(transport.clone());

    assert!(matches!(
        songlink.resolve("   ").await,
        Err(SonglinkError::InvalidInput(_))
    ));
    assert_eq!(transport.calls(), 0);
}

#[test]
fn test_resolve_blocking() {
    let transport = MockTransport::serving(load_test_data("spotify_song.json"));
    let songlink = songlink_with(transport.clone());

    let track = songlink.resolve_blocking(SPOTIFY_URI).unwrap();
    assert!(track.contains(Platform::AppleMusic));

    let again = songlink.resolve_blocking(SPOTIFY_URI).unwrap();
    assert!(Arc::ptr_eq(&track, &again));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_resolve_blocking_inside_runtime_is_rejected() {
    let songlink = songlink_with(MockTransport::serving(load_test_data("spotify_song.json")));

    assert!(matches!(
        songlink.resolve_blocking(SPOTIFY_URI),
        Err(SonglinkError::InvalidInput(_))
    ));
}

#[test]
fn test_resolve_with_invokes_success_on_worker_thread() {
    let songlink = songlink_with(MockTransport::serving(load_test_data("spotify_song.json")));
    let caller = thread::current().id();
    let (tx, rx) = mpsc::channel();

    let failure_tx = tx.clone();
    songlink.resolve_with(
        SPOTIFY_URI,
        move |track| {
            tx.send(Ok((thread::current().id(), track))).unwrap();
        },
        move |error| {
            failure_tx.send(Err(error)).unwrap();
        },
    );

    let (callback_thread, track) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("回调应在超时前被调用")
        .expect("应调用成功回调");
    assert_ne!(callback_thread, caller, "回调不应在调用方线程上执行");
    assert_eq!(track.len(), 6);

    // 只会调用一次回调
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_resolve_with_invokes_failure() {
    let songlink = songlink_with(MockTransport::serving(b"<html>502 Bad Gateway</html>".to_vec()));
    let (tx, rx) = mpsc::channel();

    let success_tx = tx.clone();
    songlink.resolve_with(
        SPOTIFY_URI,
        move |_| success_tx.send("success").unwrap(),
        move |error| {
            assert!(matches!(error, SonglinkError::MalformedResponse(_)));
            tx.send("failure").unwrap();
        },
    );

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "failure");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_resolve_with_reports_transport_panic_as_failure() {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let body = load_test_data("spotify_song.json");
    let transport = MockTransport::new({
        let healthy = Arc::clone(&healthy);
        move |_| {
            if !healthy.load(Ordering::SeqCst) {
                panic!("transport bug");
            }
            Ok(body.clone())
        }
    });
    let songlink = songlink_with(transport.clone());
    let (tx, rx) = mpsc::channel();

    let success_tx = tx.clone();
    songlink.resolve_with(
        SPOTIFY_URI,
        move |_| success_tx.send("success").unwrap(),
        move |error| {
            assert!(matches!(error, SonglinkError::Internal(_)));
            tx.send("failure").unwrap();
        },
    );

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "failure");
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    // 同一个链接之后仍可正常解析
    healthy.store(true, Ordering::SeqCst);
    let track = songlink.resolve_blocking(SPOTIFY_URI).unwrap();
    assert!(track.contains(Platform::Spotify));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_spawn_resolve() {
    let songlink = songlink_with(MockTransport::serving(load_test_data("spotify_song.json")));

    let handle = songlink.spawn_resolve(SPOTIFY_URI).unwrap();
    let track = handle.await.unwrap().unwrap();
    assert!(track.contains(Platform::Spotify));
}

#[tokio::test]
async fn test_load_thumbnail_is_memoized() {
    let json = load_test_data("spotify_song.json");
    let png = {
        let image = RgbaImage::from_pixel(8, 8, Rgba([30, 60, 90, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    };
    let transport = MockTransport::new(move |url| {
        if url.starts_with(ENDPOINT) {
            Ok(json.clone())
        } else {
            Ok(png.clone())
        }
    });
    let songlink = songlink_with(transport.clone());

    let track = songlink.resolve(SPOTIFY_URI).await.unwrap();
    let thumbnail = track
        .platform(Platform::Spotify)
        .and_then(|p| p.metadata.thumbnail.as_ref())
        .unwrap();
    assert_eq!((thumbnail.width, thumbnail.height), (640, 640));

    let image = songlink.load_thumbnail(thumbnail).await.unwrap();
    assert_eq!(image.dimensions(), (8, 8));
    songlink.load_thumbnail(thumbnail).await.unwrap();

    assert_eq!(transport.calls(), 2, "缩略图只应下载一次");
    assert_eq!(thumbnail.average_color(), Some(Rgb([30, 60, 90])));
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let transport = MockTransport::serving(load_test_data("spotify_song.json"));
    let songlink = songlink_with(transport.clone());

    songlink.resolve(SPOTIFY_URI).await.unwrap();
    songlink.invalidate(SPOTIFY_URI).unwrap();
    songlink.resolve(SPOTIFY_URI).await.unwrap();
    assert_eq!(transport.calls(), 2);

    songlink.clear_cache();
    assert_eq!(songlink.cached_len(), 0);
}
