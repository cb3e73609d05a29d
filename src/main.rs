use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lyrics_sync::config::Config;
use lyrics_sync::lyrics::{self, CueTracker, FetchOutcome, LyricsKind};
use lyrics_sync::playback::{ManualClock, MediaSource, TrackMetadata};
use lyrics_sync::store::{JsonFileStore, LyricsStore};
use lyrics_sync::utils::LrcParser;

#[derive(Debug, Parser)]
#[command(name = "lyrics-sync", version, about = "获取并同步显示歌词")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 获取歌词并写入本地缓存
    Fetch {
        #[arg(long)]
        track_id: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        album: Option<String>,
        /// 歌曲时长（秒）
        #[arg(long)]
        duration: u64,
        /// 获取纯文本歌词而不是同步歌词
        #[arg(long)]
        plain: bool,
    },
    /// 显示某个播放位置对应的歌词行
    Show {
        #[arg(long)]
        track_id: String,
        /// 播放位置（毫秒）
        #[arg(long, default_value_t = 0)]
        position: u64,
        /// 从该位置开始模拟播放，逐行输出歌词
        #[arg(long)]
        follow: bool,
    },
    /// 清除缓存字段，下次重新获取
    Reset {
        #[arg(long)]
        track_id: String,
        #[arg(long)]
        plain: bool,
    },
}

fn kind(plain: bool) -> LyricsKind {
    if plain {
        LyricsKind::Fixed
    } else {
        LyricsKind::Synced
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = Arc::new(Config::load(cli.config).context("加载配置文件")?);
    let cache_path = config.cache_path();
    let store = Arc::new(
        JsonFileStore::open(&cache_path)
            .await
            .with_context(|| format!("打开歌词缓存 {}", cache_path.display()))?,
    );
    debug!("歌词缓存: {:?}", store.path());

    match cli.command {
        Command::Fetch {
            track_id,
            artist,
            title,
            album,
            duration,
            plain,
        } => {
            let manager = lyrics::setup_lyrics_manager(config.clone(), store.clone());
            let clock = ManualClock::new(
                TrackMetadata {
                    title,
                    artist,
                    album,
                },
                Some(duration * 1000),
            );

            let cancel = CancellationToken::new();
            let guard = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("收到中断信号，取消获取");
                    guard.cancel();
                }
            });

            let outcome = manager
                .ensure_lyrics(&track_id, &clock, kind(plain), &cancel)
                .await
                .context("获取歌词")?;
            info!("获取结果: {:?}", outcome);

            if outcome != FetchOutcome::Discarded {
                let record = store.get(&track_id).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Command::Show {
            track_id,
            position,
            follow,
        } => {
            let record = store
                .get(&track_id)
                .await?
                .with_context(|| format!("缓存中没有 {} 的歌词", track_id))?;

            let synced = record.synced.as_deref().unwrap_or_default();
            if synced.is_empty() {
                match record.fixed.as_deref().filter(|s| !s.is_empty()) {
                    Some(fixed) => println!("{}", fixed),
                    None => println!("(无歌词)"),
                }
                return Ok(());
            }

            let clock = Arc::new(ManualClock::new(TrackMetadata::default(), None));
            clock.set_position(position);
            let position_source = clock.clone();
            let mut tracker =
                CueTracker::new(LrcParser::parse(synced), move || position_source.position_ms());
            print_context(&tracker);

            if follow {
                let interval = Duration::from_millis(config.timing.cue_poll_interval_ms.max(1));
                let end = tracker.cues().last().map_or(0, |cue| cue.timestamp_ms) + 1000;
                let cancel = CancellationToken::new();
                tokio::spawn(drive_clock(clock, interval, end, cancel.clone()));

                tracker
                    .follow(interval, &cancel, |_, cue| {
                        if let Some(cue) = cue {
                            println!("{}", cue.text);
                        }
                    })
                    .await;
            }
        }
        Command::Reset { track_id, plain } => {
            store
                .reset(&track_id, kind(plain))
                .await
                .with_context(|| format!("重置 {} 的歌词", track_id))?;
            println!("已重置 {} 的{}歌词", track_id, if plain { "纯文本" } else { "同步" });
        }
    }

    Ok(())
}

/// 按真实时间推进时钟，越过最后一行或收到中断信号时停止
async fn drive_clock(clock: Arc<ManualClock>, interval: Duration, end_ms: u64, cancel: CancellationToken) {
    let step = interval.as_millis() as u64;
    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        clock.advance(step);
        if clock.position_ms() > end_ms {
            break;
        }
    }
    cancel.cancel();
}

/// 打印当前行及前后各一行
fn print_context<F: Fn() -> u64>(tracker: &CueTracker<F>) {
    let cues = tracker.cues();
    let index = tracker.index();

    let start = (index - 1).max(0) as usize;
    let end = ((index + 2).max(1) as usize).min(cues.len());

    if index < 0 {
        println!("  (前奏)");
    }
    for (i, cue) in cues.iter().enumerate().take(end).skip(start) {
        let marker = if i as i64 == index { ">" } else { " " };
        let secs = cue.timestamp_ms / 1000;
        println!(
            "{} [{:02}:{:02}.{:02}] {}",
            marker,
            secs / 60,
            secs % 60,
            (cue.timestamp_ms % 1000) / 10,
            cue.text
        );
    }
}
