use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::error::Result;
use crate::lyrics::{LyricsKind, LyricsRecord};
use crate::store::{LyricsStore, MemoryStore};

/// 以 JSON 文件持久化的存储，每次变更后整体重写文件
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    // 串行化文件写入
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 打开存储文件，不存在时从空记录开始
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records: Vec<LyricsRecord> = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("歌词缓存 {:?} 不存在，将在首次写入时创建", path);
            Vec::new()
        };

        info!("已加载 {} 条歌词记录: {:?}", records.len(), path);

        Ok(Self {
            path,
            inner: MemoryStore::from_records(records),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 把替换了 `changed` 的快照写入文件，调用方需持有写锁
    async fn save_with(&self, changed: LyricsRecord) -> Result<()> {
        let mut records = self.inner.snapshot().await;
        match records.iter_mut().find(|r| r.track_id == changed.track_id) {
            Some(slot) => *slot = changed,
            None => {
                records.push(changed);
                records.sort_by(|a, b| a.track_id.cmp(&b.track_id));
            }
        }

        let content = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 先写临时文件再改名，避免中途失败留下半个文件
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("已写入 {} 条歌词记录到 {:?}", records.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl LyricsStore for JsonFileStore {
    async fn get(&self, track_id: &str) -> Result<Option<LyricsRecord>> {
        self.inner.get(track_id).await
    }

    // 先落盘再更新内存并通知订阅者，写盘失败时内存保持原样
    async fn upsert(&self, record: LyricsRecord) -> Result<LyricsRecord> {
        let _guard = self.write_lock.lock().await;

        let mut merged = self
            .inner
            .get(&record.track_id)
            .await?
            .unwrap_or_else(|| LyricsRecord::new(record.track_id.clone()));
        merged.merge(record.clone());

        self.save_with(merged).await?;
        self.inner.upsert(record).await
    }

    async fn reset(&self, track_id: &str, kind: LyricsKind) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = self.inner.get(track_id).await? else {
            return Ok(());
        };
        if !record.has(kind) {
            return Ok(());
        }
        *record.field_mut(kind) = None;

        self.save_with(record).await?;
        self.inner.reset(track_id, kind).await
    }

    async fn observe(&self, track_id: &str) -> watch::Receiver<Option<LyricsRecord>> {
        self.inner.observe(track_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("lyrics-sync-store-{}-{}", name, std::process::id()))
            .join("lyrics.json")
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let path = temp_path("reopen");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .upsert(LyricsRecord {
                track_id: "abc".into(),
                synced: Some("[00:01.00]hi".into()),
                fixed: None,
            })
            .await
            .unwrap();
        store
            .upsert(LyricsRecord {
                track_id: "abc".into(),
                synced: None,
                fixed: Some(String::new()),
            })
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let record = reopened.get("abc").await.unwrap().unwrap();
        assert_eq!(record.synced.as_deref(), Some("[00:01.00]hi"));
        assert_eq!(record.fixed.as_deref(), Some(""));

        reopened.reset("abc", LyricsKind::Synced).await.unwrap();
        let again = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(again.get("abc").await.unwrap().unwrap().synced, None);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let path = temp_path("readonly");
        let dir = path.parent().unwrap().to_path_buf();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.path(), path.as_path());
        store
            .upsert(LyricsRecord {
                track_id: "abc".into(),
                synced: Some("[00:01.00]hi".into()),
                fixed: None,
            })
            .await
            .unwrap();

        // 目录被换成普通文件，之后的写入都会失败
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a dir").unwrap();

        let mut updates = store.observe("abc").await;
        updates.borrow_and_update();

        let err = store
            .upsert(LyricsRecord {
                track_id: "abc".into(),
                synced: None,
                fixed: Some("plain".into()),
            })
            .await;
        assert!(err.is_err());
        assert!(store.reset("abc", LyricsKind::Synced).await.is_err());

        let record = store.get("abc").await.unwrap().unwrap();
        assert_eq!(record.synced.as_deref(), Some("[00:01.00]hi"));
        assert_eq!(record.fixed, None);
        assert!(!updates.has_changed().unwrap());

        std::fs::remove_file(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let path = temp_path("missing");
        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get("x").await.unwrap(), None);
        assert!(!path.exists());
    }
}
