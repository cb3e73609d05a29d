mod chain;
mod manager;
mod matching;
pub mod providers;
mod tracker;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::LyricsError;
use crate::playback::TrackMetadata;
use crate::store::LyricsStore;
use crate::utils::is_blank;

pub use chain::{FetchedLyrics, ProviderChain};
pub use manager::{FetchOutcome, LyricsManager, TrackEvent};
pub use matching::{best_duration_match, duration_matches, MatchCandidate};
pub use tracker::CueTracker;

/// 单句歌词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// 开始时间（毫秒）
    pub timestamp_ms: u64,
    /// 歌词文本
    pub text: String,
}

impl Cue {
    pub fn new(timestamp_ms: u64, text: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            text: text.into(),
        }
    }
}

/// 歌词种类：逐行同步 / 纯文本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricsKind {
    Synced,
    Fixed,
}

/// 持久化的歌词记录
///
/// 字段为 `None` 表示从未获取过，`Some("")` 表示已获取但确认没有歌词。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsRecord {
    pub track_id: String,
    pub synced: Option<String>,
    pub fixed: Option<String>,
}

impl LyricsRecord {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            ..Default::default()
        }
    }

    pub fn field(&self, kind: LyricsKind) -> Option<&str> {
        match kind {
            LyricsKind::Synced => self.synced.as_deref(),
            LyricsKind::Fixed => self.fixed.as_deref(),
        }
    }

    pub fn field_mut(&mut self, kind: LyricsKind) -> &mut Option<String> {
        match kind {
            LyricsKind::Synced => &mut self.synced,
            LyricsKind::Fixed => &mut self.fixed,
        }
    }

    /// 字段已获取过（包括确认为空）
    pub fn has(&self, kind: LyricsKind) -> bool {
        self.field(kind).is_some()
    }

    /// 字段已获取但确认没有歌词
    pub fn is_unavailable(&self, kind: LyricsKind) -> bool {
        self.field(kind).is_some_and(str::is_empty)
    }

    /// 合并新记录：新值只覆盖自己的字段，`None` 不会清掉已有内容
    pub fn merge(&mut self, incoming: LyricsRecord) {
        if incoming.synced.is_some() {
            self.synced = incoming.synced;
        }
        if incoming.fixed.is_some() {
            self.fixed = incoming.fixed;
        }
    }
}

/// 单个歌词源一次查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    /// 同步歌词，可能附带纯文本歌词
    Synced {
        markup: String,
        plain: Option<String>,
    },
    /// 只有纯文本歌词
    Fixed(String),
    NotFound,
    Failed(String),
}

impl ProviderResult {
    /// 构造同步结果，空白文本视为未找到
    pub fn synced(markup: impl Into<String>, plain: Option<String>) -> Self {
        let markup = markup.into();
        let plain = crate::utils::non_blank(plain);
        if !is_blank(&markup) {
            Self::Synced { markup, plain }
        } else if let Some(plain) = plain {
            Self::Fixed(plain)
        } else {
            Self::NotFound
        }
    }

    /// 构造纯文本结果，空白文本视为未找到
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        if is_blank(&text) {
            Self::NotFound
        } else {
            Self::Fixed(text)
        }
    }
}

impl From<Result<ProviderResult, LyricsError>> for ProviderResult {
    fn from(result: Result<ProviderResult, LyricsError>) -> Self {
        match result {
            Ok(result) => result,
            Err(LyricsError::NoMatch) => ProviderResult::NotFound,
            Err(e) => ProviderResult::Failed(e.to_string()),
        }
    }
}

/// 歌词查询条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub track_id: String,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub duration_secs: u64,
}

impl LyricsQuery {
    pub fn new(track_id: impl Into<String>, metadata: &TrackMetadata, duration_ms: u64) -> Self {
        Self {
            track_id: track_id.into(),
            artist: metadata.artist.clone(),
            title: metadata.title.clone(),
            album: metadata.album.clone().filter(|a| !is_blank(a)),
            duration_secs: duration_ms / 1000,
        }
    }

    /// "艺术家 标题" 形式的搜索关键词
    pub fn keyword(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.artist, self.title)
        }
    }
}

/// 歌词源接口
#[async_trait]
pub trait LyricSource: Send + Sync {
    /// 获取歌词源名称
    fn name(&self) -> &str;

    /// 查询一次歌词，失败以 `ProviderResult::Failed` 返回而不是错误
    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult;
}

/// 设置歌词管理器
pub fn setup_lyrics_manager(config: Arc<Config>, store: Arc<dyn LyricsStore>) -> LyricsManager {
    let (synced, plain) = providers::get_enabled_providers(&config);
    let chain = ProviderChain::new(synced, plain);
    info!("歌词源查询顺序: {}", chain.source_names().join(" -> "));
    LyricsManager::new(chain, store, config)
}
