use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::lyrics::{LyricSource, LyricsQuery, ProviderResult};
use crate::utils::{is_blank, non_blank};

/// 歌词源链的获取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedLyrics {
    pub synced: Option<String>,
    pub fixed: Option<String>,
    /// 提供同步歌词的歌词源名称
    pub source: Option<String>,
}

/// 按优先级依次查询歌词源
#[derive(Clone)]
pub struct ProviderChain {
    synced_sources: Arc<Vec<Arc<dyn LyricSource>>>,
    plain_sources: Arc<Vec<Arc<dyn LyricSource>>>,
}

impl ProviderChain {
    pub fn new(
        synced_sources: Vec<Arc<dyn LyricSource>>,
        plain_sources: Vec<Arc<dyn LyricSource>>,
    ) -> Self {
        Self {
            synced_sources: Arc::new(synced_sources),
            plain_sources: Arc::new(plain_sources),
        }
    }

    /// 获取同步歌词
    ///
    /// 第一个返回非空同步歌词的源即终止查询；途中遇到的第一份纯文本歌词作为后备保留。
    pub async fn fetch(&self, query: &LyricsQuery) -> FetchedLyrics {
        let mut fetched = FetchedLyrics::default();

        for source in self.synced_sources.iter() {
            debug!("尝试从 {} 获取同步歌词", source.name());

            match source.lookup(query).await {
                ProviderResult::Synced { markup, plain } if !is_blank(&markup) => {
                    info!(
                        "{} 提供了同步歌词: {} - {}",
                        source.name(),
                        query.artist,
                        query.title
                    );
                    fetched.synced = Some(markup);
                    fetched.source = Some(source.name().to_string());
                    if fetched.fixed.is_none() {
                        fetched.fixed = non_blank(plain);
                    }
                    return fetched;
                }
                // 同步歌词为空白时只保留可能附带的纯文本
                ProviderResult::Synced { plain, .. } => {
                    debug!("{} 返回了空白同步歌词，继续尝试下一个歌词源", source.name());
                    if fetched.fixed.is_none() {
                        fetched.fixed = non_blank(plain);
                    }
                }
                ProviderResult::Fixed(text) if !is_blank(&text) => {
                    debug!("{} 只有纯文本歌词，继续尝试下一个歌词源", source.name());
                    if fetched.fixed.is_none() {
                        fetched.fixed = Some(text);
                    }
                }
                ProviderResult::Fixed(_) | ProviderResult::NotFound => {
                    debug!("{} 未找到歌词，尝试下一个歌词源", source.name());
                }
                ProviderResult::Failed(reason) => {
                    warn!("{} 获取歌词失败: {}", source.name(), reason);
                }
            }
        }

        info!("所有歌词源均未找到同步歌词: {} - {}", query.artist, query.title);
        fetched
    }

    /// 只获取纯文本歌词
    pub async fn fetch_plain(&self, query: &LyricsQuery) -> FetchedLyrics {
        for source in self.plain_sources.iter() {
            debug!("尝试从 {} 获取纯文本歌词", source.name());

            match source.lookup(query).await {
                ProviderResult::Fixed(text)
                | ProviderResult::Synced {
                    plain: Some(text), ..
                } if !is_blank(&text) => {
                    info!("{} 提供了纯文本歌词: {} - {}", source.name(), query.artist, query.title);
                    return FetchedLyrics {
                        fixed: Some(text),
                        ..Default::default()
                    };
                }
                ProviderResult::Fixed(_) | ProviderResult::Synced { .. } | ProviderResult::NotFound => {
                    debug!("{} 没有纯文本歌词", source.name());
                }
                ProviderResult::Failed(reason) => {
                    warn!("{} 获取纯文本歌词失败: {}", source.name(), reason);
                }
            }
        }

        info!("所有歌词源均未找到纯文本歌词: {} - {}", query.artist, query.title);
        FetchedLyrics::default()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.synced_sources
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// 返回固定结果并统计调用次数的歌词源
    pub(crate) struct MockSource {
        name: String,
        result: ProviderResult,
        pub calls: AtomicUsize,
    }

    impl MockSource {
        pub(crate) fn new(name: &str, result: ProviderResult) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                result,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LyricSource for MockSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn lookup(&self, _query: &LyricsQuery) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    pub(crate) fn src(source: &Arc<MockSource>) -> Arc<dyn LyricSource> {
        source.clone()
    }

    pub(crate) fn query() -> LyricsQuery {
        LyricsQuery {
            track_id: "track".into(),
            artist: "Artist".into(),
            title: "Title".into(),
            album: None,
            duration_secs: 200,
        }
    }

    fn synced(markup: &str) -> ProviderResult {
        ProviderResult::Synced {
            markup: markup.into(),
            plain: None,
        }
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_synced() {
        let first = MockSource::new("one", synced("[00:01.00]a"));
        let rest: Vec<_> = (0..3)
            .map(|i| MockSource::new(&format!("s{i}"), synced("[00:02.00]b")))
            .collect();

        let mut sources = vec![src(&first)];
        sources.extend(rest.iter().map(src));

        let chain = ProviderChain::new(sources, Vec::new());
        assert_eq!(chain.source_names(), vec!["one", "s0", "s1", "s2"]);
        let fetched = chain.fetch(&query()).await;

        assert_eq!(fetched.synced.as_deref(), Some("[00:01.00]a"));
        assert_eq!(fetched.source.as_deref(), Some("one"));
        assert_eq!(first.calls(), 1);
        assert!(rest.iter().all(|s| s.calls() == 0));
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_chain() {
        let failing = MockSource::new("down", ProviderResult::Failed("timeout".into()));
        let missing = MockSource::new("empty", ProviderResult::NotFound);
        let working = MockSource::new("ok", synced("[00:01.00]a"));

        let chain = ProviderChain::new(
            vec![src(&failing), src(&missing), src(&working)],
            Vec::new(),
        );
        let fetched = chain.fetch(&query()).await;

        assert_eq!(fetched.synced.as_deref(), Some("[00:01.00]a"));
        assert_eq!((failing.calls(), missing.calls(), working.calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_accumulates_first_plain_fallback() {
        let plain_first = MockSource::new("p1", ProviderResult::Fixed("first plain".into()));
        let plain_second = MockSource::new("p2", ProviderResult::Fixed("second plain".into()));
        let synced_with_plain = MockSource::new(
            "s",
            ProviderResult::Synced {
                markup: "[00:01.00]a".into(),
                plain: Some("synced plain".into()),
            },
        );

        let chain = ProviderChain::new(
            vec![src(&plain_first), src(&plain_second), src(&synced_with_plain)],
            Vec::new(),
        );
        let fetched = chain.fetch(&query()).await;

        assert_eq!(fetched.synced.as_deref(), Some("[00:01.00]a"));
        assert_eq!(fetched.fixed.as_deref(), Some("first plain"));
    }

    #[tokio::test]
    async fn test_no_synced_keeps_plain() {
        let plain = MockSource::new("p", ProviderResult::Fixed("words".into()));
        let missing = MockSource::new("m", ProviderResult::NotFound);

        let chain = ProviderChain::new(vec![src(&plain), src(&missing)], Vec::new());
        let fetched = chain.fetch(&query()).await;

        assert_eq!(fetched.synced, None);
        assert_eq!(fetched.fixed.as_deref(), Some("words"));
        assert_eq!(missing.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_does_not_stop_chain() {
        let blank = MockSource::new(
            "blank",
            ProviderResult::Synced {
                markup: "   \n".into(),
                plain: Some(" ".into()),
            },
        );
        let blank_plain = MockSource::new("blank-plain", ProviderResult::Fixed("\t".into()));
        let good = MockSource::new("good", synced("[00:01.00]a"));

        let chain = ProviderChain::new(
            vec![src(&blank), src(&blank_plain), src(&good)],
            vec![src(&blank_plain), src(&blank)],
        );
        let fetched = chain.fetch(&query()).await;

        assert_eq!(fetched.synced.as_deref(), Some("[00:01.00]a"));
        assert_eq!(fetched.source.as_deref(), Some("good"));
        assert_eq!(fetched.fixed, None);
        assert_eq!(good.calls(), 1);

        let plain = chain.fetch_plain(&query()).await;
        assert_eq!(plain, FetchedLyrics::default());
    }

    #[tokio::test]
    async fn test_fetch_plain_uses_plain_sources_only() {
        let synced_only = MockSource::new("s", synced("[00:01.00]a"));
        let plain_source = MockSource::new(
            "lrclib",
            ProviderResult::Synced {
                markup: "[00:01.00]a".into(),
                plain: Some("a".into()),
            },
        );

        let chain = ProviderChain::new(vec![src(&synced_only)], vec![src(&plain_source)]);
        let fetched = chain.fetch_plain(&query()).await;

        assert_eq!(fetched.fixed.as_deref(), Some("a"));
        assert_eq!(fetched.synced, None);
        assert_eq!(synced_only.calls(), 0);
        assert_eq!(plain_source.calls(), 1);
    }
}
