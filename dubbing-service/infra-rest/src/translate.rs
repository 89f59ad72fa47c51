use std::time::Duration;

use async_trait::async_trait;
use dubbing_domain::{DomainError, Translator};
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Client for the public `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    http: Client,
    endpoint: Url,
    source_lang: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: &str, source_lang: &str, timeout: Duration) -> Result<Self, DomainError> {
        let endpoint = Url::parse(endpoint).map_err(|err| {
            DomainError::invalid_input(&format!("invalid translation endpoint: {err}"))
        })?;
        let http = Client::builder().timeout(timeout).build().map_err(|err| {
            DomainError::internal_error(&format!("failed to build http client: {err}"))
        })?;
        Ok(Self {
            http,
            endpoint,
            source_lang: source_lang.to_string(),
        })
    }

    fn request_url(&self, text: &str, target_lang: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", &self.source_lang)
            .append_pair("tl", target_lang)
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }
}

/// The response nests sentence chunks as `[[["translated", "source", ...], ...], ...]`.
pub(crate) fn parse_translation(body: &Value) -> Option<String> {
    let chunks = body.get(0)?.as_array()?;
    let text: String = chunks
        .iter()
        .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, DomainError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let response = self
            .http
            .get(self.request_url(text, target_lang))
            .send()
            .await
            .map_err(|err| DomainError::external_service_error("translation", &err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::external_service_error(
                "translation",
                &format!("HTTP {status}"),
            ));
        }
        let body: Value = response.json().await.map_err(|err| {
            DomainError::external_service_error("translation", &format!("invalid body: {err}"))
        })?;
        parse_translation(&body).ok_or_else(|| {
            DomainError::external_service_error("translation", "response carried no text")
        })
    }
}
