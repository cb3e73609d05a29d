use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 同步歌词源，按优先级排列
    pub lyrics_sources: Vec<String>,

    /// 纯文本歌词源，按优先级排列
    pub plain_sources: Vec<String>,

    /// 候选匹配设置
    pub matching: MatchingConfig,

    /// 轮询节奏
    pub timing: TimingConfig,

    /// 网络请求设置
    pub network: NetworkConfig,

    /// 歌词源特定配置
    pub sources: SourcesConfig,

    /// 本地歌词缓存
    pub cache: CacheConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    /// 时长容差（秒），候选与播放器时长相差不超过该值才接受
    pub duration_tolerance_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimingConfig {
    /// 歌词行刷新间隔（毫秒）
    pub cue_poll_interval_ms: u64,

    /// 等待歌曲时长可用的轮询间隔（毫秒）
    pub duration_poll_interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    /// 按 ID 精确匹配的歌词接口
    pub betterlyrics: Option<BetterLyricsConfig>,

    /// LRCLIB 配置（精确查询与关键词搜索共用）
    pub lrclib: Option<LrclibConfig>,

    /// 网易云音乐配置
    pub netease: Option<NeteaseConfig>,

    /// 酷狗音乐配置
    pub kugou: Option<KugouConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BetterLyricsConfig {
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LrclibConfig {
    pub base_url: String,
}

/// 网易云音乐配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NeteaseConfig {
    /// weapi 接口根地址
    pub base_url: String,

    /// 搜索返回的候选数量
    pub search_limit: u32,
}

/// 酷狗音乐配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KugouConfig {
    /// 歌词候选搜索地址
    pub search_url: String,

    /// 歌词下载地址
    pub download_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 歌词记录 JSON 文件路径
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lyrics_sources: [
                "betterlyrics",
                "lrclib",
                "netease",
                "lrclib-search",
                "kugou",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            plain_sources: vec!["lrclib".to_string()],
            matching: MatchingConfig::default(),
            timing: TimingConfig::default(),
            network: NetworkConfig::default(),
            sources: SourcesConfig {
                betterlyrics: Some(BetterLyricsConfig {
                    base_url: "https://lyrics-api.boidu.dev/api".to_string(),
                }),
                lrclib: Some(LrclibConfig {
                    base_url: "https://lrclib.net/api".to_string(),
                }),
                netease: Some(NeteaseConfig::default()),
                kugou: Some(KugouConfig::default()),
            },
            cache: CacheConfig::default(),
        }
    }
}

impl Default for NeteaseConfig {
    fn default() -> Self {
        Self {
            base_url: "https://music.163.com".to_string(),
            search_limit: 30,
        }
    }
}

impl Default for KugouConfig {
    fn default() -> Self {
        Self {
            search_url: "https://krcs.kugou.com/search".to_string(),
            download_url: "https://lyrics.kugou.com/download".to_string(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            duration_tolerance_secs: 3,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cue_poll_interval_ms: 50,
            duration_poll_interval_ms: 100,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            user_agent: format!(
                "{}/{} (https://github.com/lyrics-sync)",
                PKG_NAME,
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let path = dirs::cache_dir()
            .map(|p| p.join(PKG_NAME).join("lyrics.json"))
            .unwrap_or_else(|| PathBuf::from(format!("{}-lyrics.json", PKG_NAME)));

        Self {
            path: path.to_string_lossy().to_string(),
        }
    }
}

impl Config {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(PKG_NAME).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(format!("{}-config.toml", PKG_NAME)))
    }

    /// 加载配置，支持从指定路径或默认路径加载
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        debug!("尝试从 {:?} 加载配置文件", config_path);

        if !config_path.exists() {
            debug!("配置文件 {:?} 不存在，将创建默认配置", config_path);
            let default_config = Config::default();
            let toml = toml::to_string_pretty(&default_config).context("序列化默认配置")?;

            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("创建目录 {}", parent.display()))?;
            }

            fs::write(&config_path, toml)
                .with_context(|| format!("写入 {}", config_path.display()))?;
            info!("已创建默认配置文件: {:?}", config_path);
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("读取 {}", config_path.display()))?;
        let config = Self::parse(&content).unwrap_or_else(|e| {
            error!("解析配置文件 {:?} 失败: {}", config_path, e);
            warn!("由于解析错误，将加载默认配置");
            Config::default()
        });

        debug!("已成功加载配置文件");
        Ok(config)
    }

    /// 从 TOML 文本解析配置，缺省字段取默认值
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 将 `~/` 开头的路径展开为用户目录
    pub fn cache_path(&self) -> PathBuf {
        match self.cache.path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            None => PathBuf::from(&self.cache.path),
        }
    }
}
