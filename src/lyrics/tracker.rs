use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::lyrics::Cue;

/// 根据播放位置跟踪当前歌词行
///
/// [`CueTracker::poll`] 本身不做定时，调用方按固定节奏（约 50ms）调用，
/// 或者用 [`CueTracker::follow`] 以 `timing.cue_poll_interval_ms` 驱动。
/// 歌词序列构造后不可修改，换歌时重新构造。
pub struct CueTracker<F>
where
    F: Fn() -> u64,
{
    cues: Vec<Cue>,
    position: F,
    index: i64,
}

impl<F> CueTracker<F>
where
    F: Fn() -> u64,
{
    /// `cues` 必须已按时间升序排列（`LrcParser::parse` 的输出即满足）
    pub fn new(cues: Vec<Cue>, position: F) -> Self {
        let mut tracker = Self {
            cues,
            position,
            index: -1,
        };
        tracker.index = tracker.current_index();
        tracker
    }

    /// 最后一个开始时间不晚于当前位置的行，位置在所有行之前或没有歌词时为 -1
    pub fn current_index(&self) -> i64 {
        let position = (self.position)();
        let count = self.cues.partition_point(|cue| cue.timestamp_ms <= position);
        count as i64 - 1
    }

    /// 上一次 poll 得到的行号
    pub fn index(&self) -> i64 {
        self.index
    }

    /// 重新计算行号，只有变化时返回 true
    pub fn poll(&mut self) -> bool {
        let index = self.current_index();
        if index == self.index {
            return false;
        }
        self.index = index;
        true
    }

    pub fn current_cue(&self) -> Option<&Cue> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.cues.get(i))
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// 按固定间隔 poll，行号变化时回调，直到令牌被取消
    pub async fn follow<C>(&mut self, interval: Duration, cancel: &CancellationToken, mut on_change: C)
    where
        C: FnMut(i64, Option<&Cue>),
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if self.poll() {
                on_change(self.index, self.current_cue());
            }
        }
    }
}
