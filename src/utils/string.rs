use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("字符过滤正则"));

/// 净化字符串，移除特殊字符，用于歌曲匹配
pub fn sanitize_string(input: &str) -> String {
    NON_WORD.replace_all(input, "").trim().to_lowercase()
}

/// 比较两个字符串的相似度，范围 0.0 ~ 1.0
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a_clean = sanitize_string(a);
    let b_clean = sanitize_string(b);

    if a_clean.is_empty() || b_clean.is_empty() {
        return 0.0;
    }

    strsim::normalized_levenshtein(&a_clean, &b_clean)
}

/// 文本为空或只包含空白
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// 把可能为空白的文本转成 None
pub fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !is_blank(t))
}

/// 统一歌词源返回文本中的常见转义与换行
pub fn normalize_lyrics(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace('’', "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_similarity() {
        // 完全一致的字符串
        assert_eq!(string_similarity("hello world", "hello world"), 1.0);

        // 完全不一致的字符串
        assert!(string_similarity("hello", "world") < 0.5);

        // 部分一致的字符串
        assert!(string_similarity("hello world", "hello") > 0.4);

        // 特殊字符和大小写被忽略
        assert_eq!(string_similarity("Hello, World!", "hello world"), 1.0);

        assert_eq!(string_similarity("", "hello"), 0.0);
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize_string("Hello, World!"), "hello world");
        assert_eq!(sanitize_string("  Test-123  "), "test123");
        assert_eq!(sanitize_string(""), "");
    }

    #[test]
    fn test_blank_handling() {
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" a "));
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("x".into())), Some("x".into()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_normalize_lyrics() {
        assert_eq!(normalize_lyrics("It&apos;s\r\nok"), "It's\nok");
        assert_eq!(normalize_lyrics("rock &amp; roll’"), "rock & roll'");
    }
}
