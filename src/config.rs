//! 负责处理客户端配置：默认值、校验、构建器以及从 JSON 文件加载。

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Songlink,
    api::DEFAULT_ENDPOINT,
    error::{Result, SonglinkError},
    pool::WorkerPool,
    transport::{ReqwestTransport, Transport},
};

/// 默认的 User-Agent。
pub const DEFAULT_USER_AGENT: &str = concat!("songlink-rs/", env!("CARGO_PKG_VERSION"));
/// 默认的国家/地区代码。
pub const DEFAULT_COUNTRY_CODE: &str = "US";
/// 默认的缓存容量。
pub const DEFAULT_CACHE_SIZE: usize = 500;
/// 默认的缓存访问后过期时间（2 小时）。
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(2 * 60 * 60);

const CONFIG_DIR_NAME: &str = "songlink-rs";
const CONFIG_FILE_NAME: &str = "config.json";

/// 客户端配置。构建完成后不再改变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonglinkConfig {
    /// 两位字母的国家/地区代码，Songlink 用它来选择各平台的商店目录。
    pub country_code: String,
    /// Songlink API key。
    ///
    /// 未配置时上游会把请求限制在每分钟 10 次左右。本库不会为此节流，
    /// 超出限制时表现为普通的传输错误。
    pub api_key: Option<String>,
    /// 请求上游时发送的 User-Agent。
    pub user_agent: String,
    /// `/links` 接口地址。
    pub endpoint: String,
    /// 缓存最多保留的条目数。
    pub cache_size: usize,
    /// 缓存条目在最后一次访问后的存活时间，序列化为秒。
    #[serde(with = "duration_secs")]
    pub cache_duration: Duration,
}

impl Default for SonglinkConfig {
    fn default() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_size: DEFAULT_CACHE_SIZE,
            cache_duration: DEFAULT_CACHE_DURATION,
        }
    }
}

impl SonglinkConfig {
    /// 检查配置是否可用。
    ///
    /// # 错误
    /// 国家代码不是两位大写 ASCII 字母、缓存容量为 0、
    /// User-Agent 或接口地址为空时返回 `SonglinkError::InvalidConfig`。
    pub fn validate(&self) -> Result<()> {
        let country = &self.country_code;
        if country.len() != 2 || !country.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(SonglinkError::InvalidConfig(format!(
                "国家代码必须是两位大写字母，得到 '{country}'"
            )));
        }
        if self.cache_size == 0 {
            return Err(SonglinkError::InvalidConfig("缓存容量必须大于 0".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(SonglinkError::InvalidConfig("User-Agent 不能为空".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SonglinkError::InvalidConfig("接口地址不能为空".to_string()));
        }
        Ok(())
    }

    /// 从 JSON 文件加载配置。文件中缺少的字段使用默认值。
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| SonglinkError::InvalidConfig(format!("解析配置文件失败: {e}")))?;
        config.country_code = config.country_code.to_ascii_uppercase();
        config.validate()?;
        info!("已从 {:?} 加载 Songlink 配置。", path.as_ref());
        Ok(config)
    }

    /// 从用户配置目录下的 `songlink-rs/config.json` 加载配置。
    ///
    /// 文件不存在时返回默认配置。
    pub fn load_default() -> Result<Self> {
        let path = default_config_path()?;
        match Self::load_from_file(&path) {
            Err(SonglinkError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("配置文件 {:?} 不存在，使用默认配置。", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// 将配置序列化为 JSON 并保存到文件。
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SonglinkError::Internal(format!("序列化配置失败: {e}")))?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), content)?;
        info!("Songlink 配置已保存到 {:?}。", path.as_ref());
        Ok(())
    }
}

/// 获取默认配置文件的完整路径。
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| {
        SonglinkError::Io(Arc::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "无法找到用户配置目录",
        )))
    })?;
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    Ok(path)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// [`Songlink`] 的构建器。未设置的项使用默认值。
#[derive(Clone, Default)]
pub struct SonglinkBuilder {
    config: SonglinkConfig,
    transport: Option<Arc<dyn Transport>>,
    pool: Option<WorkerPool>,
}

impl SonglinkBuilder {
    /// 以默认配置创建构建器。
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有配置创建构建器。
    pub fn from_config(config: SonglinkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 两位字母的国家/地区代码，会被转换为大写。默认 `US`。
    pub fn country(mut self, country_code: impl AsRef<str>) -> Self {
        self.config.country_code = country_code.as_ref().trim().to_ascii_uppercase();
        self
    }

    /// 访问 Songlink 时使用的 API key。
    ///
    /// **不设置时上游会限制为每分钟约 10 次请求。**
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// 访问 Songlink 时使用的 User-Agent。默认为 [`DEFAULT_USER_AGENT`]。
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 自定义 `/links` 接口地址，例如指向自建代理。
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// 缓存条目在最后一次访问后的存活时间。默认 2 小时。
    pub fn cache_duration(mut self, expiration: Duration) -> Self {
        self.config.cache_duration = expiration;
        self
    }

    /// 缓存最多保留的条目数。默认 500。
    pub fn cache_size(mut self, size: usize) -> Self {
        self.config.cache_size = size;
        self
    }

    /// 替换默认的 `reqwest` 传输实现。
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// 指定执行非阻塞解析的线程池。默认使用 [`WorkerPool::shared`]。
    pub fn worker_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 校验配置并构建 [`Songlink`] 实例。
    ///
    /// 实例应当被视为长期存在的共享对象，除非确有需要（例如使用不同的 API key），
    /// 不要重复创建。
    pub fn build(self) -> Result<Songlink> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()),
        };
        Ok(Songlink::from_parts(self.config, transport, self.pool))
    }
}

impl std::fmt::Debug for SonglinkBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonglinkBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("pool", &self.pool)
            .finish()
    }
}
