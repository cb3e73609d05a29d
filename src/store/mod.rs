// 歌词记录持久化
// 存储本身由外部提供，这里定义接口并提供内存与 JSON 文件两种实现

mod json_file;
mod memory;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::lyrics::{LyricsKind, LyricsRecord};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// 歌词记录存储接口
#[async_trait]
pub trait LyricsStore: Send + Sync {
    /// 读取记录，不存在时为 None
    async fn get(&self, track_id: &str) -> Result<Option<LyricsRecord>>;

    /// 合并写入：只覆盖新记录中为 Some 的字段，返回合并后的记录
    ///
    /// 读取-合并-写入在存储内部一次完成，同一进程内的并发写不会互相覆盖其他字段。
    async fn upsert(&self, record: LyricsRecord) -> Result<LyricsRecord>;

    /// 把某个字段重置为“未获取”，用于重新获取歌词
    async fn reset(&self, track_id: &str, kind: LyricsKind) -> Result<()>;

    /// 订阅记录变化，接收端的初始值即当前记录
    async fn observe(&self, track_id: &str) -> watch::Receiver<Option<LyricsRecord>>;
}
