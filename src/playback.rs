// 播放位置/时长来源
// 真实播放器由外部实现，这里只定义接口并提供一个手动驱动的实现

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// 轨道元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// 歌曲标题
    pub title: String,
    /// 艺术家
    pub artist: String,
    /// 专辑
    pub album: Option<String>,
}

/// 媒体位置与时长来源，调用应当廉价且不阻塞
pub trait MediaSource: Send + Sync {
    /// 当前播放位置（毫秒）
    fn position_ms(&self) -> u64;

    /// 歌曲时长（毫秒），未知时为 None
    fn duration_ms(&self) -> Option<u64>;

    /// 当前轨道元数据
    fn metadata(&self) -> TrackMetadata;
}

const UNKNOWN_DURATION: u64 = u64::MAX;

/// 由调用方手动推进的时钟，适用于命令行和测试
#[derive(Debug)]
pub struct ManualClock {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    metadata: RwLock<TrackMetadata>,
}

impl ManualClock {
    pub fn new(metadata: TrackMetadata, duration_ms: Option<u64>) -> Self {
        Self {
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(duration_ms.unwrap_or(UNKNOWN_DURATION)),
            metadata: RwLock::new(metadata),
        }
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.position_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }

    pub fn set_duration(&self, duration_ms: Option<u64>) {
        self.duration_ms
            .store(duration_ms.unwrap_or(UNKNOWN_DURATION), Ordering::Relaxed);
    }

    /// 换歌：替换元数据并把位置归零
    pub fn load_track(&self, metadata: TrackMetadata, duration_ms: Option<u64>) {
        match self.metadata.write() {
            Ok(mut guard) => *guard = metadata,
            Err(poisoned) => *poisoned.into_inner() = metadata,
        }
        self.set_duration(duration_ms);
        self.set_position(0);
    }
}

impl MediaSource for ManualClock {
    fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Relaxed)
    }

    fn duration_ms(&self) -> Option<u64> {
        match self.duration_ms.load(Ordering::Relaxed) {
            UNKNOWN_DURATION => None,
            duration => Some(duration),
        }
    }

    fn metadata(&self) -> TrackMetadata {
        match self.metadata.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(TrackMetadata::default(), None);
        assert_eq!(clock.duration_ms(), None);

        clock.set_duration(Some(180_000));
        clock.advance(1500);
        clock.advance(500);
        assert_eq!(clock.duration_ms(), Some(180_000));
        assert_eq!(clock.position_ms(), 2000);

        clock.load_track(
            TrackMetadata {
                title: "Next".into(),
                ..Default::default()
            },
            None,
        );
        assert_eq!(clock.position_ms(), 0);
        assert_eq!(clock.duration_ms(), None);
        assert_eq!(clock.metadata().title, "Next");
    }
}
