use std::time::Duration;

use dubbing_domain::DomainError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

const ERROR_BODY_CHARS: usize = 500;

/// JSON-over-HTTP client for the inference sidecar.
#[derive(Debug, Clone)]
pub struct SidecarClient {
    http: Client,
    base_url: String,
}

impl SidecarClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http = Client::builder().timeout(timeout).build().map_err(|err| {
            DomainError::internal_error(&format!("failed to build http client: {err}"))
        })?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn post_json<Req, Resp>(
        &self,
        service: &str,
        path: &str,
        body: &Req,
    ) -> Result<Resp, DomainError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.send(service, path, body).await?;
        response.json::<Resp>().await.map_err(|err| {
            DomainError::external_service_error(service, &format!("invalid response body: {err}"))
        })
    }

    pub async fn post_for_bytes<Req>(
        &self,
        service: &str,
        path: &str,
        body: &Req,
    ) -> Result<Vec<u8>, DomainError>
    where
        Req: Serialize + ?Sized,
    {
        let response = self.send(service, path, body).await?;
        let bytes = response.bytes().await.map_err(|err| {
            DomainError::external_service_error(service, &format!("reading body failed: {err}"))
        })?;
        Ok(bytes.to_vec())
    }

    async fn send<Req>(&self, service: &str, path: &str, body: &Req) -> Result<Response, DomainError>
    where
        Req: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!(service = service, url = %url, "sidecar request");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| DomainError::external_service_error(service, &err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_CHARS).collect();
        Err(DomainError::external_service_error(
            service,
            &format!("HTTP {status}: {body}"),
        ))
    }
}
