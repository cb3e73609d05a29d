// 同步歌词核心库

// 模块导出
pub mod config;
pub mod error;
pub mod lyrics;
pub mod playback;
pub mod store;
pub mod utils;
