use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use openssl::rsa::{Padding, Rsa};
use openssl::symm::{encrypt, Cipher};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::NeteaseConfig;
use crate::error::{LyricsError, Result};
use crate::lyrics::providers::check_status;
use crate::lyrics::{best_duration_match, LyricSource, LyricsQuery, MatchCandidate, ProviderResult};
use crate::utils::normalize_lyrics;

const SEARCH_PATH: &str = "/weapi/cloudsearch/pc";
const LYRIC_PATH: &str = "/weapi/song/lyric";
const REFERER: &str = "https://music.163.com/";
const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_1_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.87 Safari/537.36";

mod weapi {
    use super::*;

    const BASE62_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const PRESET_KEY: &[u8] = b"0CoJUm6Qyw8W8jud";
    const IV: &[u8] = b"0102030405060708";
    const PUBKEY: &[u8] = b"-----BEGIN PUBLIC KEY-----\nMIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDgtQn2JZ34ZC28NWYpAUd98iZ37BUrX/aKzmFbt7clFSs6sXqHauqKWqdtLkF2KexO40H1YTX8z2lSgBBOAxLsvaklV8k4cBFK9snQXE9/DDaFt6Rr7iVZMldczhC0JNgTz+SHXT6CBHuX3e9SdB1Ua44oncaTWz7OBGLbCiK45wIDAQAB\n-----END PUBLIC KEY-----";
    const RSA_BLOCK: usize = 128;

    /// weapi 表单
    #[derive(Serialize, Debug)]
    pub struct Form {
        pub params: String,
        #[serde(rename = "encSecKey")]
        pub enc_sec_key: String,
    }

    fn crypto_err(e: openssl::error::ErrorStack) -> LyricsError {
        LyricsError::Decode(format!("weapi 加密失败: {}", e))
    }

    fn random_secret() -> [u8; 16] {
        let mut rng = rand::rng();
        std::array::from_fn(|_| BASE62_CHARSET[rng.random_range(0..BASE62_CHARSET.len())])
    }

    fn aes_b64(data: &[u8], key: &[u8]) -> Result<String> {
        let enc = encrypt(Cipher::aes_128_cbc(), key, Some(IV), data).map_err(crypto_err)?;
        Ok(general_purpose::STANDARD.encode(enc))
    }

    fn rsa_no_padding(data: &[u8]) -> Result<String> {
        let rsa = Rsa::public_key_from_pem(PUBKEY).map_err(crypto_err)?;

        // 左侧补零到 128 字节
        let mut block = vec![0u8; RSA_BLOCK - data.len()];
        block.extend_from_slice(data);

        let mut out = vec![0u8; rsa.size() as usize];
        rsa.public_encrypt(&block, &mut out, Padding::NONE)
            .map_err(crypto_err)?;
        Ok(hex::encode(out))
    }

    /// 两次 AES 加密请求体，随机密钥倒序后用 RSA 加密
    pub fn encrypt_form(data: &Value) -> Result<Form> {
        let mut secret = random_secret();
        let once = aes_b64(data.to_string().as_bytes(), PRESET_KEY)?;
        let params = aes_b64(once.as_bytes(), &secret)?;

        secret.reverse();
        Ok(Form {
            params,
            enc_sec_key: rsa_no_padding(&secret)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Option<Vec<Song>>,
}

#[derive(Debug, Deserialize)]
struct Song {
    id: u64,
    name: String,
    /// cloudsearch 返回 dt（毫秒），旧接口返回 duration
    #[serde(default, alias = "duration")]
    dt: Option<u64>,
}

impl Song {
    fn candidate(&self) -> MatchCandidate {
        MatchCandidate {
            duration_secs: self.dt.map(|ms| ms as f64 / 1000.0),
            title: self.name.clone(),
            ..Default::default()
        }
    }
}

/// 网易云音乐歌词提供者：关键词搜索后按时长挑选
pub struct NeteaseProvider {
    client: reqwest::Client,
    base_url: String,
    search_limit: u32,
    tolerance_secs: u64,
}

impl NeteaseProvider {
    /// 创建新的网易云音乐歌词提供者
    pub fn new(client: reqwest::Client, config: NeteaseConfig, tolerance_secs: u64) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_limit: config.search_limit,
            tolerance_secs,
        }
    }

    async fn post(&self, path: &str, data: Value) -> Result<Option<Value>> {
        let form = weapi::encrypt_form(&data)?;

        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Referer", REFERER)
            .header("User-Agent", BROWSER_UA)
            .form(&form)
            .send()
            .await?;

        match check_status(self.name(), resp)? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    /// 搜索歌曲
    async fn search(&self, keyword: &str) -> Result<Vec<Song>> {
        debug!("网易云音乐搜索关键词: '{}'", keyword);

        let data = json!({
            "s": keyword,
            "type": 1,
            "offset": 0,
            "total": true,
            "limit": self.search_limit,
        });

        let Some(json) = self.post(SEARCH_PATH, data).await? else {
            return Ok(Vec::new());
        };
        let resp: SearchResponse = serde_json::from_value(json)?;
        Ok(resp.result.and_then(|r| r.songs).unwrap_or_default())
    }

    /// 获取歌词
    async fn get_lyric(&self, song_id: u64) -> Result<Option<String>> {
        debug!("获取网易云音乐歌词, ID: {}", song_id);

        let data = json!({
            "id": song_id,
            "lv": -1,
            "kv": -1,
            "tv": -1,
            "os": "osx",
        });

        let Some(json) = self.post(LYRIC_PATH, data).await? else {
            return Ok(None);
        };
        Ok(json
            .pointer("/lrc/lyric")
            .and_then(Value::as_str)
            .map(normalize_lyrics))
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<ProviderResult> {
        let keyword = if query.artist.is_empty() {
            query.title.clone()
        } else {
            format!("{} - {}", query.artist, query.title)
        };

        let songs = self.search(&keyword).await?;
        info!("网易云音乐搜索结果数量: {}", songs.len());

        let song = pick_song(&songs, query, self.tolerance_secs).ok_or(LyricsError::NoMatch)?;
        info!("网易云音乐最佳匹配: {} (ID: {}, {:?}ms)", song.name, song.id, song.dt);

        Ok(match self.get_lyric(song.id).await? {
            Some(lyric) => ProviderResult::synced(lyric, None),
            None => ProviderResult::NotFound,
        })
    }
}

fn pick_song<'a>(songs: &'a [Song], query: &LyricsQuery, tolerance_secs: u64) -> Option<&'a Song> {
    let candidates: Vec<(&Song, MatchCandidate)> =
        songs.iter().map(|song| (song, song.candidate())).collect();

    best_duration_match(
        &candidates,
        |(_, c)| c,
        &query.title,
        query.duration_secs,
        tolerance_secs,
    )
    .map(|(song, _)| *song)
}

#[async_trait]
impl LyricSource for NeteaseProvider {
    fn name(&self) -> &str {
        "netease"
    }

    async fn lookup(&self, query: &LyricsQuery) -> ProviderResult {
        if query.title.is_empty() {
            info!("歌曲标题为空，跳过网易云音乐搜索");
            return ProviderResult::NotFound;
        }
        self.fetch(query).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: u64, name: &str, dt: Option<u64>) -> Song {
        Song {
            id,
            name: name.into(),
            dt,
        }
    }

    fn query() -> LyricsQuery {
        LyricsQuery {
            track_id: "id".into(),
            artist: "五月天".into(),
            title: "玫瑰少年".into(),
            album: None,
            duration_secs: 216,
        }
    }

    #[test]
    fn test_pick_song_by_duration() {
        let songs = vec![
            song(1, "玫瑰少年 (Live)", Some(250_000)),
            song(2, "玫瑰少年", Some(219_000)),
            song(3, "玫瑰少年", Some(220_000)),
        ];
        assert_eq!(pick_song(&songs, &query(), 3).map(|s| s.id), Some(2));
        assert!(pick_song(&songs[2..], &query(), 3).is_none());
    }

    #[test]
    fn test_search_response_shapes() {
        let cloud = r#"{"result":{"songs":[{"id":5,"name":"a","dt":1000}]},"code":200}"#;
        let resp: SearchResponse = serde_json::from_str(cloud).unwrap();
        assert_eq!(resp.result.unwrap().songs.unwrap()[0].dt, Some(1000));

        let legacy = r#"{"result":{"songs":[{"id":5,"name":"a","duration":2000}]}}"#;
        let resp: SearchResponse = serde_json::from_str(legacy).unwrap();
        assert_eq!(resp.result.unwrap().songs.unwrap()[0].dt, Some(2000));

        let empty: SearchResponse = serde_json::from_str(r#"{"code":200}"#).unwrap();
        assert!(empty.result.is_none());
    }

    #[test]
    fn test_base_url_from_config() {
        let provider = NeteaseProvider::new(
            reqwest::Client::new(),
            NeteaseConfig {
                base_url: "http://127.0.0.1:3000/".into(),
                search_limit: 5,
            },
            3,
        );
        assert_eq!(provider.base_url, "http://127.0.0.1:3000");
        assert_eq!(provider.search_limit, 5);
    }

    #[test]
    fn test_weapi_form() {
        let form = weapi::encrypt_form(&json!({"s": "test"})).unwrap();
        assert_eq!(form.enc_sec_key.len(), 256);
        assert!(general_purpose::STANDARD.decode(&form.params).is_ok());
    }
}
