//! Machine translation client and language detection.
//!
//! Translation goes to a LibreTranslate-compatible REST endpoint in fixed
//! batches. Each batch round-trip must preserve segment count; only text
//! payloads change.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

/// Translation API client.
pub struct TranslationClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Vec<String>,
}

impl TranslationClient {
    /// Create a client for the given endpoint.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> WorkerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let base_url = std::env::var("TRANSLATE_API_URL")
            .map_err(|_| WorkerError::config_error("TRANSLATE_API_URL not set"))?;
        let api_key = std::env::var("TRANSLATE_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    /// Translate one batch of texts.
    ///
    /// The returned vector must be the same length as the input; a
    /// mismatch is a hard failure, never silently accepted.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> WorkerResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            count = texts.len(),
            source, target, "Translating segment batch"
        );

        let request = TranslateRequest {
            q: texts,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WorkerError::TranslationFailed(e.to_string()))?;

        let body: TranslateResponse = response.json().await?;

        if body.translated_text.len() != texts.len() {
            return Err(WorkerError::TranslationMismatch {
                expected: texts.len(),
                actual: body.translated_text.len(),
            });
        }

        Ok(body.translated_text)
    }
}

/// Detect the dominant language of a text by Unicode script counting.
///
/// Used when a job declares its source language as "auto": the
/// transcriber already produced text, and scripts/diacritics identify the
/// language well enough to pick a translation source. Latin-script text
/// without Vietnamese diacritics falls back to English.
pub fn detect_language(text: &str) -> &'static str {
    let mut han = 0usize;
    let mut kana = 0usize;
    let mut hangul = 0usize;
    let mut cyrillic = 0usize;
    let mut arabic = 0usize;
    let mut hebrew = 0usize;
    let mut thai = 0usize;
    let mut devanagari = 0usize;
    let mut greek = 0usize;
    let mut vietnamese = 0usize;
    let mut letters = 0usize;

    for c in text.chars() {
        if !c.is_alphabetic() {
            continue;
        }
        letters += 1;
        match c {
            '\u{4E00}'..='\u{9FFF}' => han += 1,
            '\u{3040}'..='\u{30FF}' => kana += 1,
            '\u{AC00}'..='\u{D7AF}' => hangul += 1,
            '\u{0400}'..='\u{04FF}' => cyrillic += 1,
            '\u{0600}'..='\u{06FF}' => arabic += 1,
            '\u{0590}'..='\u{05FF}' => hebrew += 1,
            '\u{0E00}'..='\u{0E7F}' => thai += 1,
            '\u{0900}'..='\u{097F}' => devanagari += 1,
            '\u{0370}'..='\u{03FF}' => greek += 1,
            'ơ' | 'ư' | 'Ơ' | 'Ư' | 'ă' | 'Ă' | 'ạ' | 'ả' | 'ấ' | 'ầ' | 'ẩ' | 'ẫ'
            | 'ậ' | 'ắ' | 'ằ' | 'ẳ' | 'ặ' | 'ẹ' | 'ẻ' | 'ẽ' | 'ế' | 'ề' | 'ể'
            | 'ễ' | 'ệ' | 'ỉ' | 'ị' | 'ọ' | 'ỏ' | 'ố' | 'ồ' | 'ổ' | 'ỗ' | 'ộ'
            | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ' | 'ụ' | 'ủ' | 'ứ' | 'ừ' | 'ử' | 'ữ'
            | 'ự' | 'ỳ' | 'ỵ' | 'ỷ' | 'ỹ' => vietnamese += 1,
            _ => {}
        }
    }

    if letters == 0 {
        return "en";
    }

    // Kana wins over Han: Japanese text mixes both, Chinese has no kana.
    if kana * 20 >= letters {
        return "ja";
    }

    let threshold = letters / 4;
    let scripts = [
        (han, "zh"),
        (hangul, "ko"),
        (cyrillic, "ru"),
        (arabic, "ar"),
        (hebrew, "he"),
        (thai, "th"),
        (devanagari, "hi"),
        (greek, "el"),
    ];
    for (count, code) in scripts {
        if count > threshold {
            return code;
        }
    }

    if vietnamese * 50 >= letters {
        return "vi";
    }

    "en"
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_detect_latin_defaults_to_english() {
        assert_eq!(detect_language("The quick brown fox jumps over the lazy dog"), "en");
    }

    #[test]
    fn test_detect_major_scripts() {
        assert_eq!(detect_language("这是一个中文句子，用来测试语言检测"), "zh");
        assert_eq!(detect_language("これは日本語のテストです"), "ja");
        assert_eq!(detect_language("이것은 한국어 문장입니다"), "ko");
        assert_eq!(detect_language("Это предложение на русском языке"), "ru");
        assert_eq!(detect_language("هذه جملة باللغة العربية للاختبار"), "ar");
    }

    #[test]
    fn test_detect_vietnamese_diacritics() {
        assert_eq!(detect_language("Tiếng Việt là ngôn ngữ của người Việt Nam"), "vi");
    }

    #[test]
    fn test_detect_empty_text() {
        assert_eq!(detect_language("123 456 !!!"), "en");
    }

    #[tokio::test]
    async fn test_translate_batch_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": ["Hola", "Mundo"]
            })))
            .mount(&server)
            .await;

        let client = TranslationClient::new(server.uri(), None).unwrap();
        let out = client
            .translate_batch(&["Hello".into(), "World".into()], "en", "es")
            .await
            .unwrap();
        assert_eq!(out, vec!["Hola".to_string(), "Mundo".to_string()]);
    }

    #[tokio::test]
    async fn test_translate_batch_count_mismatch_is_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": ["only one"]
            })))
            .mount(&server)
            .await;

        let client = TranslationClient::new(server.uri(), None).unwrap();
        let result = client
            .translate_batch(&["a".into(), "b".into()], "en", "es")
            .await;

        match result {
            Err(WorkerError::TranslationMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected TranslationMismatch, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_translate_empty_batch_is_noop() {
        let client = TranslationClient::new("http://localhost:1", None).unwrap();
        let out = client.translate_batch(&[], "en", "es").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_translate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = TranslationClient::new(server.uri(), None).unwrap();
        let result = client.translate_batch(&["a".into()], "en", "es").await;
        assert!(matches!(result, Err(WorkerError::TranslationFailed(_))));
    }
}
