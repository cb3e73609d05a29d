use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::KugouConfig;
use crate::error::{LyricsError, Result};
use crate::lyrics::providers::check_status;
use crate::lyrics::{LyricSource, LyricsQuery, ProviderResult};
use crate::utils::normalize_lyrics;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    id: String,
    accesskey: String,
    #[serde(default)]
    song: Option<String>,
    #[serde(default)]
    singer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default)]
    content: Option<String>,
}

/// 酷狗音乐歌词提供者
///
/// 最后的兜底：取关键词搜索的第一个候选，不检查时长。
pub struct KugouProvider {
    client: reqwest::Client,
    search_url: String,
    download_url: String,
}

impl KugouProvider {
    pub fn new(client: reqwest::Client, config: KugouConfig) -> Self {
        Self {
            client,
            search_url: config.search_url,
            download_url: config.download_url,
        }
    }

    async fn search(&self, keyword: &str, duration_ms: u64) -> Result<Vec<Candidate>> {
        debug!("酷狗音乐搜索关键词: '{}'", keyword);

        let duration = duration_ms.to_string();
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[
                ("ver", "1"),
                ("man", "yes"),
                ("client", "mobi"),
                ("keyword", keyword),
                ("duration", duration.as_str()),
                ("hash", ""),
            ])
            .send()
            .await?;

        match check_status(self.name(), resp)? {
            Some(resp) => Ok(resp.json::<SearchResponse>().await?.candidates),
            None => Ok(Vec::new()),
        }
    }

    async fn download(&self, candidate: &Candidate) -> Result<Option<String>> {
        debug!("下载酷狗音乐歌词, ID: {}", candidate.id);

        let resp = self
            .client
            .get(&self.download_url)
            .query(&[
                ("ver", "1"),
                ("client", "pc"),
                ("id", candidate.id.as_str()),
                ("accesskey", candidate.accesskey.as_str()),
                ("fmt", "lrc"),
                ("charset", "utf8"),
            ])
            .send()
            .await?;

        let Some(resp) = check_status(self.name(), resp)? else {
            return Ok(None);
        };
        let data: DownloadResponse = resp.json().await?;

        data.content.as_deref().map(decode_content).transpose()
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<ProviderResult> {
        let keyword = format!("{} - {}", query.artist, query.title);
        let candidates = self.search(&keyword, query.duration_secs * 1000).await?;

        let Some(first) = candidates.first() else {
            return Ok(ProviderResult::NotFound);
        };
        info!(
            "酷狗音乐使用第一个候选: {} - {} (ID: {})",
            first.singer.as_deref().unwrap_or_default(),
            first.song.as_deref().unwrap_or_default(),
            first.id
        );

        Ok(match self.download(first).await? {
            Some(lyric) => ProviderResult::synced(lyric, None),
            None => ProviderResult::NotFound,
        })
    }
}

/// 解码 base64 歌词内容，去掉 BOM 并统一换行
fn decode_content(content: &str) -> Result<String> {
    let bytes = general_purpose::STANDARD
        .decode(content.trim())
        .map_err(|e| LyricsError::Decode(format!("酷狗歌词 base64 解码失败: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| LyricsError::Decode(format!("酷狗歌词不是有效的 UTF-8: {}", e)))?;

    Ok(normalize_lyrics(text.trim_start_matches('\u{feff}')))
}

#[async_trait]
impl LyricSource for KugouProvider {
    fn name(&self) -> &str {
        "kugou"
    }

    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult {
        if query.title.is_empty() {
            return ProviderResult::NotFound;
        }
        self.fetch(query).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content() {
        let encoded = general_purpose::STANDARD.encode("\u{feff}[00:01.00]hello\r\n[00:02.00]world");
        assert_eq!(
            decode_content(&encoded).unwrap(),
            "[00:01.00]hello\n[00:02.00]world"
        );
    }

    #[test]
    fn test_urls_from_config() {
        let provider = KugouProvider::new(
            reqwest::Client::new(),
            KugouConfig {
                search_url: "http://127.0.0.1:8080/search".into(),
                ..Default::default()
            },
        );
        assert_eq!(provider.search_url, "http://127.0.0.1:8080/search");
        assert_eq!(provider.download_url, "https://lyrics.kugou.com/download");
    }

    #[test]
    fn test_decode_invalid_content() {
        assert!(matches!(decode_content("not base64!!"), Err(LyricsError::Decode(_))));
    }

    #[test]
    fn test_search_response() {
        let json = r#"{"status":200,"candidates":[{"id":"123","accesskey":"ABC","song":"s","singer":"a","duration":216000}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.candidates[0].accesskey, "ABC");

        let empty: SearchResponse = serde_json::from_str(r#"{"status":404}"#).unwrap();
        assert!(empty.candidates.is_empty());
    }
}
