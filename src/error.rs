use thiserror::Error;

/// 歌词子系统的错误类型
#[derive(Error, Debug)]
pub enum LyricsError {
    /// 网络/传输失败
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 歌词源返回了意外的状态码或数据结构
    #[error("接口错误: {0}")]
    Api(String),

    #[error("JSON 解析错误: {0}")]
    Serde(#[from] serde_json::Error),

    /// base64/加密等编解码失败
    #[error("解码错误: {0}")]
    Decode(String),

    /// 候选结果均不满足时长容差
    #[error("没有满足时长容差的候选结果")]
    NoMatch,

    #[error("存储错误: {0}")]
    Store(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 调用方取消了本次获取（例如切歌）
    #[error("操作已取消")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LyricsError>;
