use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Public lookup service for Bible passages.
pub const BIBLE_API_URL: &str = "https://bible-api.com";

/// Bible edition identified by its short API code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Translation {
    #[default]
    Kjv,
    Web,
    Bbe,
    Asv,
}

impl Translation {
    pub fn code(&self) -> &'static str {
        match self {
            Translation::Kjv => "kjv",
            Translation::Web => "web",
            Translation::Bbe => "bbe",
            Translation::Asv => "asv",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kjv" => Some(Translation::Kjv),
            "web" => Some(Translation::Web),
            "bbe" => Some(Translation::Bbe),
            "asv" => Some(Translation::Asv),
            _ => None,
        }
    }

    pub fn all() -> Vec<Translation> {
        vec![
            Translation::Kjv,
            Translation::Web,
            Translation::Bbe,
            Translation::Asv,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Translation::Kjv => "King James Version",
            Translation::Web => "World English Bible",
            Translation::Bbe => "Bible in Basic English",
            Translation::Asv => "American Standard Version",
        }
    }
}

/// One search action's worth of input; built fresh each time, never stored.
#[derive(Debug, Clone)]
pub struct VerseQuery {
    pub book: String,
    pub reference: String,
    pub translation: Translation,
}

/// A single numbered verse line as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerseLine {
    pub verse: u32,
    pub text: String,
}

/// A fetched passage: the canonical reference plus its verse lines,
/// in the order the service returned them. Only `reference` and the
/// `verse`/`text` fields of each line are part of the contract; anything
/// else in the body is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerseResult {
    pub reference: String,
    pub verses: Vec<VerseLine>,
}

#[derive(Debug, Error)]
pub enum VerseError {
    /// The service did not recognize the book/reference (HTTP 404).
    #[error("no passage found for that book and verse")]
    NotFound,
    /// Any status other than 200 or 404.
    #[error("unexpected response from the lookup service (status {0})")]
    Unexpected(u16),
    /// Network-level failure: timeout, DNS, connection reset.
    #[error("could not reach the lookup service: {0}")]
    Transport(String),
    /// HTTP 200 whose body did not parse as passage data.
    #[error("the lookup service returned an unreadable passage")]
    Malformed,
}

#[derive(Clone)]
pub struct BibleClient {
    client: Client,
    base_url: String,
}

impl BibleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Looks up a passage with a single best-effort GET. No retries; the
    /// caller decides what to do with each error class.
    pub async fn fetch_verse(&self, query: &VerseQuery) -> Result<VerseResult, VerseError> {
        let url = format!(
            "{}/{}+{}?translation={}",
            self.base_url,
            query.book,
            query.reference,
            query.translation.code()
        );
        debug!("fetching passage: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VerseError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(VerseError::NotFound),
            StatusCode::OK => response.json::<VerseResult>().await.map_err(|e| {
                if e.is_decode() {
                    VerseError::Malformed
                } else {
                    VerseError::Transport(e.to_string())
                }
            }),
            status => Err(VerseError::Unexpected(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_codes_round_trip() {
        for t in Translation::all() {
            assert_eq!(Translation::from_code(t.code()), Some(t));
        }
        assert_eq!(Translation::from_code("KJV"), Some(Translation::Kjv));
        assert_eq!(Translation::from_code("niv"), None);
    }

    #[test]
    fn default_translation_is_kjv() {
        assert_eq!(Translation::default(), Translation::Kjv);
    }

    #[test]
    fn verse_result_parses_and_ignores_extra_fields() {
        let body = r#"{
            "reference": "Jeremiah 29:11",
            "verses": [
                {"book_id": "JER", "book_name": "Jeremiah", "chapter": 29, "verse": 11, "text": "For I know the thoughts that I think toward you..."}
            ],
            "text": "For I know the thoughts that I think toward you...",
            "translation_id": "kjv",
            "translation_name": "King James Version"
        }"#;
        let result: VerseResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.reference, "Jeremiah 29:11");
        assert_eq!(result.verses.len(), 1);
        assert_eq!(result.verses[0].verse, 11);
        assert!(result.verses[0].text.starts_with("For I know"));
    }

    #[test]
    fn verse_result_rejects_missing_fields() {
        let body = r#"{"reference": "Jeremiah 29:11"}"#;
        assert!(serde_json::from_str::<VerseResult>(body).is_err());
    }
}
