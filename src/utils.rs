// 通用工具：LRC 解析与字符串处理

mod lrc;
mod string;

pub use lrc::LrcParser;
pub use string::{is_blank, non_blank, normalize_lyrics, sanitize_string, string_similarity};
