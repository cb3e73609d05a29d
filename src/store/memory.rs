use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::lyrics::{LyricsKind, LyricsRecord};
use crate::store::LyricsStore;

/// 进程内存储，每条记录对应一个 watch 通道
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, watch::Sender<Option<LyricsRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = LyricsRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.track_id.clone(), watch::Sender::new(Some(record))))
            .collect();

        Self {
            records: Mutex::new(records),
        }
    }

    /// 当前所有记录的快照，按 track_id 排序
    pub async fn snapshot(&self) -> Vec<LyricsRecord> {
        let records = self.records.lock().await;
        let mut list: Vec<LyricsRecord> = records
            .values()
            .filter_map(|sender| sender.borrow().clone())
            .collect();
        list.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        list
    }
}

#[async_trait]
impl LyricsStore for MemoryStore {
    async fn get(&self, track_id: &str) -> Result<Option<LyricsRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .get(track_id)
            .and_then(|sender| sender.borrow().clone()))
    }

    async fn upsert(&self, record: LyricsRecord) -> Result<LyricsRecord> {
        let mut records = self.records.lock().await;
        let sender = records
            .entry(record.track_id.clone())
            .or_insert_with(|| watch::Sender::new(None));

        let mut merged = None;
        sender.send_modify(|current| {
            let mut next = current
                .take()
                .unwrap_or_else(|| LyricsRecord::new(record.track_id.clone()));
            next.merge(record);
            merged = Some(next.clone());
            *current = Some(next);
        });

        let merged = merged.unwrap_or_default();
        debug!(
            "写入歌词记录 {}: synced={:?}, fixed={:?}",
            merged.track_id,
            merged.synced.as_ref().map(String::len),
            merged.fixed.as_ref().map(String::len)
        );
        Ok(merged)
    }

    async fn reset(&self, track_id: &str, kind: LyricsKind) -> Result<()> {
        let records = self.records.lock().await;
        if let Some(sender) = records.get(track_id) {
            sender.send_if_modified(|current| match current {
                Some(record) if record.has(kind) => {
                    *record.field_mut(kind) = None;
                    true
                }
                _ => false,
            });
        }
        Ok(())
    }

    async fn observe(&self, track_id: &str) -> watch::Receiver<Option<LyricsRecord>> {
        let mut records = self.records.lock().await;
        // 没有记录且已无人订阅的条目可以丢弃
        records.retain(|_, sender| sender.borrow().is_some() || sender.receiver_count() > 0);
        records
            .entry(track_id.to_string())
            .or_insert_with(|| watch::Sender::new(None))
            .subscribe()
    }
}
