use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::BetterLyricsConfig;
use crate::error::Result;
use crate::lyrics::providers::check_status;
use crate::lyrics::{LyricSource, LyricsQuery, ProviderResult};

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    #[serde(default)]
    lyrics: Option<Vec<TimedLine>>,
}

#[derive(Debug, Deserialize)]
struct TimedLine {
    text: String,
    /// 毫秒
    time: u64,
}

/// 按轨道 ID 精确查询的歌词源
pub struct BetterLyricsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl BetterLyricsProvider {
    pub fn new(client: reqwest::Client, config: BetterLyricsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, track_id: &str) -> Result<ProviderResult> {
        let url = format!("{}/lyrics", self.base_url);
        debug!("BetterLyrics 按 ID 查询: {}", track_id);

        let resp = self.client.get(&url).query(&[("id", track_id)]).send().await?;
        let Some(resp) = check_status(self.name(), resp)? else {
            return Ok(ProviderResult::NotFound);
        };

        let data: LyricsResponse = resp.json().await?;
        let lines = data.lyrics.unwrap_or_default();
        if lines.is_empty() {
            return Ok(ProviderResult::NotFound);
        }

        info!("BetterLyrics 返回 {} 行歌词", lines.len());
        Ok(ProviderResult::synced(to_lrc(&lines), None))
    }
}

/// 把逐行时间转换成 [mm:ss.cc] 标签格式
fn to_lrc(lines: &[TimedLine]) -> String {
    lines
        .iter()
        .map(|line| {
            let total_secs = line.time / 1000;
            format!(
                "[{:02}:{:02}.{:02}]{}\n",
                total_secs / 60,
                total_secs % 60,
                (line.time % 1000) / 10,
                line.text
            )
        })
        .collect()
}

#[async_trait]
impl LyricSource for BetterLyricsProvider {
    fn name(&self) -> &str {
        "betterlyrics"
    }

    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult {
        if query.track_id.is_empty() {
            return ProviderResult::NotFound;
        }
        self.fetch(&query.track_id).await.into()
    }
}
