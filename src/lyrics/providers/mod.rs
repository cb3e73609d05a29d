mod betterlyrics;
mod kugou;
mod lrclib;
mod netease;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use crate::config::{Config, NetworkConfig};
use crate::error::{LyricsError, Result};
use crate::lyrics::LyricSource;

pub use betterlyrics::BetterLyricsProvider;
pub use kugou::KugouProvider;
pub use lrclib::{LrclibClient, LrclibProvider, LrclibSearchProvider};
pub use netease::NeteaseProvider;

/// 创建带超时和 UA 的 HTTP 客户端
pub(crate) fn build_client(network: &NetworkConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(network.request_timeout_secs))
        .user_agent(network.user_agent.clone())
        .build()
        .unwrap_or_default()
}

/// 检查响应状态：404 视为没有结果，其他非 2xx 视为接口错误
pub(crate) fn check_status(source: &str, resp: Response) -> Result<Option<Response>> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        debug!("{} 返回 404", source);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(LyricsError::Api(format!("{} 请求失败: HTTP {}", source, status)));
    }
    Ok(Some(resp))
}

/// 获取所有启用的歌词提供者，返回 (同步歌词源, 纯文本歌词源)
pub fn get_enabled_providers(
    config: &Config,
) -> (Vec<Arc<dyn LyricSource>>, Vec<Arc<dyn LyricSource>>) {
    debug!(
        "加载启用的歌词提供者，同步歌词源: {:?}，纯文本歌词源: {:?}",
        config.lyrics_sources, config.plain_sources
    );

    let synced = build_sources(config, &config.lyrics_sources);
    let plain = build_sources(config, &config.plain_sources);

    info!("成功加载 {} 个同步歌词源", synced.len());
    for (i, provider) in synced.iter().enumerate() {
        info!("同步歌词源 #{}: {}", i + 1, provider.name());
    }
    info!("成功加载 {} 个纯文本歌词源", plain.len());

    (synced, plain)
}

fn build_sources(config: &Config, names: &[String]) -> Vec<Arc<dyn LyricSource>> {
    let client = build_client(&config.network);
    let tolerance = config.matching.duration_tolerance_secs;
    let mut providers: Vec<Arc<dyn LyricSource>> = Vec::new();

    for name in names {
        match name.as_str() {
            "betterlyrics" => match &config.sources.betterlyrics {
                Some(cfg) => providers.push(Arc::new(BetterLyricsProvider::new(
                    client.clone(),
                    cfg.clone(),
                ))),
                None => warn!("已启用 BetterLyrics 歌词源，但未找到相关配置"),
            },
            "lrclib" => match &config.sources.lrclib {
                Some(cfg) => providers.push(Arc::new(LrclibProvider::new(
                    LrclibClient::new(client.clone(), cfg.clone()),
                    tolerance,
                ))),
                None => warn!("已启用 LRCLIB 歌词源，但未找到相关配置"),
            },
            "lrclib-search" => match &config.sources.lrclib {
                Some(cfg) => providers.push(Arc::new(LrclibSearchProvider::new(
                    LrclibClient::new(client.clone(), cfg.clone()),
                    tolerance,
                ))),
                None => warn!("已启用 LRCLIB 搜索歌词源，但未找到相关配置"),
            },
            "netease" => match &config.sources.netease {
                Some(cfg) => providers.push(Arc::new(NeteaseProvider::new(
                    client.clone(),
                    cfg.clone(),
                    tolerance,
                ))),
                None => warn!("已启用网易云音乐歌词源，但未找到相关配置"),
            },
            "kugou" => match &config.sources.kugou {
                Some(cfg) => {
                    providers.push(Arc::new(KugouProvider::new(client.clone(), cfg.clone())))
                }
                None => warn!("已启用酷狗音乐歌词源，但未找到相关配置"),
            },
            _ => {
                warn!("未知的歌词源: {}", name);
            }
        }
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourcesConfig;

    fn names(sources: &[Arc<dyn LyricSource>]) -> Vec<&str> {
        sources.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_default_providers_in_priority_order() {
        let (synced, plain) = get_enabled_providers(&Config::default());
        assert_eq!(
            names(&synced),
            vec!["betterlyrics", "lrclib", "netease", "lrclib-search", "kugou"]
        );
        assert_eq!(names(&plain), vec!["lrclib"]);
    }

    #[test]
    fn test_unknown_and_unconfigured_sources_are_skipped() {
        let config = Config {
            lyrics_sources: vec!["kugou".into(), "musixmatch".into(), "netease".into()],
            sources: SourcesConfig {
                kugou: Some(crate::config::KugouConfig::default()),
                ..Default::default()
            },
            ..Config::default()
        };

        let (synced, _) = get_enabled_providers(&config);
        assert_eq!(names(&synced), vec!["kugou"]);
    }
}
