//! LRCLIB 歌词接口
//!
//! 同一个接口提供两种查询方式：按元数据精确查询（`/get`）和关键词搜索（`/search`）。
//! 文档: https://lrclib.net/docs

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::LrclibConfig;
use crate::error::{LyricsError, Result};
use crate::lyrics::providers::check_status;
use crate::lyrics::{
    best_duration_match, duration_matches, LyricSource, LyricsQuery, MatchCandidate,
    ProviderResult,
};
use crate::utils::{is_blank, normalize_lyrics};

/// LRCLIB 返回的歌曲记录
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LrclibTrack {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub album_name: Option<String>,
    /// 秒
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: Option<bool>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

impl LrclibTrack {
    fn candidate(&self) -> MatchCandidate {
        MatchCandidate {
            duration_secs: self.duration,
            title: self.track_name.clone().unwrap_or_default(),
            synced: self.synced_lyrics.clone(),
            plain: self.plain_lyrics.clone(),
        }
    }

    fn into_result(self) -> ProviderResult {
        ProviderResult::synced(
            self.synced_lyrics.as_deref().map(normalize_lyrics).unwrap_or_default(),
            self.plain_lyrics.as_deref().map(normalize_lyrics),
        )
    }
}

/// LRCLIB API 客户端
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub fn new(client: reqwest::Client, config: LrclibConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 按元数据精确查询，服务端负责匹配
    pub async fn get(&self, query: &LyricsQuery) -> Result<Option<LrclibTrack>> {
        let mut params = vec![
            ("artist_name", query.artist.clone()),
            ("track_name", query.title.clone()),
            ("duration", query.duration_secs.to_string()),
        ];
        if let Some(album) = &query.album {
            params.push(("album_name", album.clone()));
        }

        debug!("LRCLIB 精确查询: {} - {}", query.artist, query.title);

        let resp = self
            .client
            .get(format!("{}/get", self.base_url))
            .query(&params)
            .send()
            .await?;

        match check_status("lrclib", resp)? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    /// 关键词搜索，返回多个候选
    pub async fn search(&self, keyword: &str) -> Result<Vec<LrclibTrack>> {
        debug!("LRCLIB 搜索关键词: '{}'", keyword);

        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", keyword)])
            .send()
            .await?;

        match check_status("lrclib-search", resp)? {
            Some(resp) => Ok(resp.json().await?),
            None => Ok(Vec::new()),
        }
    }
}

/// 按元数据查询：时长缺失或在容差内才接受
pub struct LrclibProvider {
    client: LrclibClient,
    tolerance_secs: u64,
}

impl LrclibProvider {
    pub fn new(client: LrclibClient, tolerance_secs: u64) -> Self {
        Self {
            client,
            tolerance_secs,
        }
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<ProviderResult> {
        let Some(track) = self.client.get(query).await? else {
            return Ok(ProviderResult::NotFound);
        };

        if !accept_reported_duration(track.duration, query.duration_secs, self.tolerance_secs) {
            debug!(
                "LRCLIB 时长不匹配: {:?}s vs {}s",
                track.duration, query.duration_secs
            );
            return Err(LyricsError::NoMatch);
        }

        Ok(track.into_result())
    }
}

/// 服务端匹配的结果：未报告时长（或为 0）时直接接受
fn accept_reported_duration(reported: Option<f64>, requested_secs: u64, tolerance_secs: u64) -> bool {
    match reported {
        None => true,
        Some(d) if d <= 0.0 => true,
        Some(d) => duration_matches(d, requested_secs, tolerance_secs),
    }
}

#[async_trait]
impl LyricSource for LrclibProvider {
    fn name(&self) -> &str {
        "lrclib"
    }

    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult {
        self.fetch(query).await.into()
    }
}

/// 关键词搜索：在带同步歌词的候选中挑时长最接近的一个
pub struct LrclibSearchProvider {
    client: LrclibClient,
    tolerance_secs: u64,
}

impl LrclibSearchProvider {
    pub fn new(client: LrclibClient, tolerance_secs: u64) -> Self {
        Self {
            client,
            tolerance_secs,
        }
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<ProviderResult> {
        let results = self.client.search(&query.keyword()).await?;
        info!("LRCLIB 搜索结果数量: {}", results.len());

        let best = pick_search_result(results, query, self.tolerance_secs)
            .ok_or(LyricsError::NoMatch)?;

        debug!(
            "LRCLIB 搜索最佳匹配: {:?} ({:?}s)",
            best.track_name, best.duration
        );
        Ok(best.into_result())
    }
}

fn pick_search_result(
    results: Vec<LrclibTrack>,
    query: &LyricsQuery,
    tolerance_secs: u64,
) -> Option<LrclibTrack> {
    let candidates: Vec<(LrclibTrack, MatchCandidate)> = results
        .into_iter()
        .map(|track| {
            let candidate = track.candidate();
            (track, candidate)
        })
        .filter(|(_, c)| c.synced.as_deref().is_some_and(|s| !is_blank(s)))
        .collect();

    best_duration_match(
        &candidates,
        |(_, c)| c,
        &query.title,
        query.duration_secs,
        tolerance_secs,
    )
    .map(|(track, _)| track.clone())
}

#[async_trait]
impl LyricSource for LrclibSearchProvider {
    fn name(&self) -> &str {
        "lrclib-search"
    }

    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult {
        self.fetch(query).await.into()
    }
}
