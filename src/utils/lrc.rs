use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::lyrics::Cue;

// 时间标签: [mm:ss] / [mm:ss.f] / [mm:ss:f]，小数部分 1-3 位
static TIME_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+):(\d{1,2})(?:[.:](\d{1,3}))?\]").expect("时间标签正则"));

// 全局偏移: [offset: -500]
static OFFSET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[offset:\s*(-?\d+)\s*\]").expect("偏移正则"));

// 元数据: [ar:艺术家]
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-zA-Z]+):(.*)\]$").expect("元数据正则"));

/// LRC歌词解析器，用于解析常见的LRC格式歌词
pub struct LrcParser;

impl LrcParser {
    /// 解析LRC格式的歌词，返回按时间升序排列的歌词行
    ///
    /// 无法识别的行会被静默跳过，空输入返回空序列，不会报错。
    pub fn parse(content: &str) -> Vec<Cue> {
        let offset = Self::offset(content);
        let mut cues = Vec::new();

        for line in content.lines() {
            let mut timestamps = Vec::new();

            for cap in TIME_TAG.captures_iter(line) {
                match Self::tag_millis(&cap) {
                    Some(ms) => timestamps.push(ms),
                    None => debug!("跳过无法解析的时间标签: '{}'", &cap[0]),
                }
            }

            if timestamps.is_empty() {
                continue;
            }

            // 去掉所有时间标签后剩下的就是歌词文本
            let text = TIME_TAG.replace_all(line, "").trim().to_string();

            for ms in timestamps {
                let shifted = ms.saturating_add(offset).max(0) as u64;
                cues.push(Cue::new(shifted, text.clone()));
            }
        }

        // sort_by_key 是稳定排序，相同时间保持原文顺序
        cues.sort_by_key(|cue| cue.timestamp_ms);
        cues
    }

    /// 提取 [ar:...] 之类的元数据标签（不含 offset）
    pub fn metadata(content: &str) -> Vec<(String, String)> {
        content
            .lines()
            .filter_map(|line| {
                let cap = META_TAG.captures(line.trim())?;
                let key = cap[1].to_lowercase();
                if key == "offset" {
                    return None;
                }
                Some((key, cap[2].trim().to_string()))
            })
            .collect()
    }

    /// 全局偏移（毫秒），多个时以最后一个为准
    fn offset(content: &str) -> i64 {
        OFFSET_TAG
            .captures_iter(content)
            .filter_map(|cap| cap[1].parse::<i64>().ok())
            .last()
            .unwrap_or(0)
    }

    /// 超出 i64 范围的时间标签视为无效
    fn tag_millis(cap: &regex::Captures<'_>) -> Option<i64> {
        let mins = cap[1].parse::<u64>().ok()?;
        let secs = cap[2].parse::<u64>().ok()?;
        let millis = match cap.get(3).map(|m| m.as_str()) {
            None => 0,
            // 1 位为十分之一秒，2 位为百分之一秒，3 位为毫秒
            Some(frac) => {
                let value = frac.parse::<u64>().ok()?;
                match frac.len() {
                    1 => value * 100,
                    2 => value * 10,
                    _ => value,
                }
            }
        };

        let total = mins
            .checked_mul(60_000)?
            .checked_add(secs * 1000)?
            .checked_add(millis)?;
        i64::try_from(total).ok()
    }
}
