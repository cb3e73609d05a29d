use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{LyricsError, Result};
use crate::lyrics::{FetchedLyrics, LyricsKind, LyricsQuery, LyricsRecord, ProviderChain};
use crate::playback::MediaSource;
use crate::store::LyricsStore;

/// 一次 `ensure_lyrics` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 记录里已有该字段（包括确认为空），没有查询任何歌词源
    AlreadyPresent,
    /// 获取到歌词并写入
    Resolved,
    /// 所有歌词源都没有结果，已写入空字符串
    Exhausted,
    /// 获取期间被取消，结果被丢弃
    Discarded,
}

/// 播放器事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// 切换到新轨道，需要跟踪该轨道的某种歌词
    TrackChanged { track_id: String, kind: LyricsKind },
    /// 停止播放
    Stopped,
}

/// 歌词管理器
///
/// 负责在记录缺少歌词时查询歌词源链，并把结果合并写回存储。
#[derive(Clone)]
pub struct LyricsManager {
    chain: ProviderChain,
    store: Arc<dyn LyricsStore>,
    config: Arc<Config>,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl LyricsManager {
    /// 创建新的歌词管理器
    pub fn new(chain: ProviderChain, store: Arc<dyn LyricsStore>, config: Arc<Config>) -> Self {
        Self {
            chain,
            store,
            config,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// 确保记录中有指定种类的歌词
    ///
    /// 字段已存在（包括 `""`）时直接返回；否则等待播放器给出时长，
    /// 查询歌词源链并把结果合并写入。令牌在查询期间被取消时结果会被丢弃。
    pub async fn ensure_lyrics(
        &self,
        track_id: &str,
        media: &dyn MediaSource,
        kind: LyricsKind,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        if let Some(record) = self.store.get(track_id).await? {
            if record.has(kind) {
                debug!("{} 已有 {:?} 歌词，跳过获取", track_id, kind);
                return Ok(FetchOutcome::AlreadyPresent);
            }
        }

        let duration_ms = self.wait_for_duration(media, cancel).await?;
        let query = LyricsQuery::new(track_id, &media.metadata(), duration_ms);
        info!(
            "开始获取 {:?} 歌词: {} - {} ({}s)",
            kind, query.artist, query.title, query.duration_secs
        );

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("{} 的歌词获取已取消，丢弃结果", track_id);
                return Ok(FetchOutcome::Discarded);
            }
            fetched = self.fetch(&query, kind) => fetched,
        };

        if cancel.is_cancelled() {
            info!("{} 的歌词获取已取消，丢弃结果", track_id);
            return Ok(FetchOutcome::Discarded);
        }

        let (record, outcome) = build_record(track_id, kind, fetched);
        self.store.upsert(record).await?;

        match outcome {
            FetchOutcome::Resolved => info!("已保存 {} 的 {:?} 歌词", track_id, kind),
            _ => info!("未找到 {} 的 {:?} 歌词，标记为无歌词", track_id, kind),
        }
        Ok(outcome)
    }

    async fn fetch(&self, query: &LyricsQuery, kind: LyricsKind) -> FetchedLyrics {
        match kind {
            LyricsKind::Synced => self.chain.fetch(query).await,
            LyricsKind::Fixed => self.chain.fetch_plain(query).await,
        }
    }

    /// 轮询直到播放器报告时长
    async fn wait_for_duration(
        &self,
        media: &dyn MediaSource,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let interval = Duration::from_millis(self.config.timing.duration_poll_interval_ms.max(1));

        loop {
            if let Some(duration_ms) = media.duration_ms() {
                return Ok(duration_ms);
            }
            debug!("歌曲时长未知，{:?} 后重试", interval);

            tokio::select! {
                _ = cancel.cancelled() => return Err(LyricsError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// 把字段重置为未获取，下次 ensure 时重新获取
    pub async fn reset(&self, track_id: &str, kind: LyricsKind) -> Result<()> {
        info!("重置 {} 的 {:?} 歌词", track_id, kind);
        self.store.reset(track_id, kind).await
    }

    /// 写入用户手动编辑的歌词
    pub async fn set_manual(
        &self,
        track_id: &str,
        kind: LyricsKind,
        text: impl Into<String>,
    ) -> Result<LyricsRecord> {
        let mut record = LyricsRecord::new(track_id);
        *record.field_mut(kind) = Some(text.into());
        self.store.upsert(record).await
    }

    /// 启动跟随循环，直到事件通道关闭
    ///
    /// 每次换歌都会取消上一首歌的任务，并为新轨道启动一个订阅存储的任务。
    pub async fn run(&self, media: Arc<dyn MediaSource>, mut events: mpsc::Receiver<TrackEvent>) {
        info!("歌词管理器启动");

        while let Some(event) = events.recv().await {
            match event {
                TrackEvent::TrackChanged { track_id, kind } => {
                    info!("轨道变更: {}", track_id);
                    let token = self.replace_token(Some(CancellationToken::new())).await;
                    if let Some(token) = token {
                        tokio::spawn(self.clone().follow(media.clone(), track_id, kind, token));
                    }
                }
                TrackEvent::Stopped => {
                    debug!("播放停止，取消当前歌词任务");
                    self.replace_token(None).await;
                }
            }
        }

        self.replace_token(None).await;
        debug!("歌词管理器收到终止信号");
    }

    /// 取消旧令牌并换上新令牌，返回新令牌的副本
    async fn replace_token(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.cancel();
        }
        *current = next;
        current.clone()
    }

    /// 订阅轨道记录，字段缺失时获取歌词，直到令牌被取消
    async fn follow(
        self,
        media: Arc<dyn MediaSource>,
        track_id: String,
        kind: LyricsKind,
        cancel: CancellationToken,
    ) {
        let mut updates = self.store.observe(&track_id).await;

        loop {
            let missing = !updates
                .borrow_and_update()
                .as_ref()
                .is_some_and(|record| record.has(kind));

            if missing {
                match self
                    .ensure_lyrics(&track_id, media.as_ref(), kind, &cancel)
                    .await
                {
                    Ok(FetchOutcome::Discarded) | Err(LyricsError::Cancelled) => return,
                    Ok(outcome) => debug!("{} 歌词获取结果: {:?}", track_id, outcome),
                    Err(e) => warn!("获取 {} 的歌词失败: {}", track_id, e),
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// 请求的字段总会被写入（没有结果时为 `""`），另一字段只在获取到时写入
fn build_record(track_id: &str, kind: LyricsKind, fetched: FetchedLyrics) -> (LyricsRecord, FetchOutcome) {
    let mut record = LyricsRecord {
        track_id: track_id.to_string(),
        synced: fetched.synced,
        fixed: fetched.fixed,
    };

    let field = record.field_mut(kind);
    let outcome = if field.is_some() {
        FetchOutcome::Resolved
    } else {
        *field = Some(String::new());
        FetchOutcome::Exhausted
    };

    (record, outcome)
}
