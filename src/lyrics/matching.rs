use std::cmp::Ordering;

use crate::utils::string_similarity;

/// 歌词源给出的候选歌曲
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCandidate {
    /// 候选时长（秒），部分接口不提供
    pub duration_secs: Option<f64>,
    pub title: String,
    pub synced: Option<String>,
    pub plain: Option<String>,
}

/// 时长是否落在容差内，`|候选 - 请求| <= tolerance`
///
/// 候选时长先截断到整秒再比较，203.5 秒与 200 秒视为相差 3 秒。
pub fn duration_matches(candidate_secs: f64, requested_secs: u64, tolerance_secs: u64) -> bool {
    duration_diff(candidate_secs, requested_secs) <= tolerance_secs as f64
}

fn duration_diff(candidate_secs: f64, requested_secs: u64) -> f64 {
    (candidate_secs.trunc() - requested_secs as f64).abs()
}

/// 在候选中挑出时长最接近且在容差内的一个
///
/// 时长差相同则按标题相似度，仍相同则保持原顺序。没有时长的候选不参与。
pub fn best_duration_match<'a, T>(
    candidates: &'a [T],
    candidate: impl Fn(&T) -> &MatchCandidate,
    title: &str,
    requested_secs: u64,
    tolerance_secs: u64,
) -> Option<&'a T> {
    let mut best: Option<(&T, f64, f64)> = None;

    for item in candidates {
        let c = candidate(item);
        let Some(duration) = c.duration_secs else {
            continue;
        };
        if !duration_matches(duration, requested_secs, tolerance_secs) {
            continue;
        }

        let diff = duration_diff(duration, requested_secs);
        let score = string_similarity(title, &c.title);

        let better = match &best {
            None => true,
            Some((_, best_diff, best_score)) => match diff.partial_cmp(best_diff) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => score > *best_score,
                _ => false,
            },
        };

        if better {
            best = Some((item, diff, score));
        }
    }

    best.map(|(item, _, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, duration: Option<f64>) -> MatchCandidate {
        MatchCandidate {
            duration_secs: duration,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(duration_matches(203.0, 200, 3));
        assert!(duration_matches(197.0, 200, 3));
        assert!(!duration_matches(204.0, 200, 3));
        assert!(!duration_matches(196.0, 200, 3));
    }

    #[test]
    fn test_fractional_duration_is_truncated() {
        assert!(duration_matches(203.5, 200, 3));
        assert!(duration_matches(203.99, 200, 3));
        assert!(!duration_matches(204.1, 200, 3));
        assert!(!duration_matches(196.5, 200, 3));
    }

    #[test]
    fn test_best_match_prefers_smallest_difference() {
        let list = vec![
            candidate("Song", Some(203.0)),
            candidate("Song", Some(201.0)),
            candidate("Song", Some(250.0)),
        ];
        let best = best_duration_match(&list, |c| c, "Song", 200, 3).unwrap();
        assert_eq!(best.duration_secs, Some(201.0));
    }

    #[test]
    fn test_best_match_ties_use_title_similarity() {
        let list = vec![
            candidate("Something Else", Some(201.0)),
            candidate("Song (Live)", Some(199.0)),
            candidate("Song", Some(201.0)),
        ];
        let best = best_duration_match(&list, |c| c, "Song", 200, 3).unwrap();
        assert_eq!(best.title, "Song");
    }

    #[test]
    fn test_best_match_none_within_tolerance() {
        let list = vec![candidate("Song", Some(204.0)), candidate("Song", None)];
        assert!(best_duration_match(&list, |c| c, "Song", 200, 3).is_none());
    }
}
