use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use dubbing_domain::{DomainError, MediaFetcher};
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

const SERVICE: &str = "download";

/// Streams the response body straight to disk.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    http: Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| {
                DomainError::internal_error(&format!("failed to build http client: {err}"))
            })?;
        Ok(Self { http })
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DomainError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| DomainError::external_service_error(SERVICE, &err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::external_service_error(
                SERVICE,
                &format!("HTTP {status}"),
            ));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                DomainError::external_service_error(SERVICE, &format!("body stream: {err}"))
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(DomainError::external_service_error(SERVICE, "empty body"));
        }
        Ok(written)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DomainError> {
        match self.download(url, destination).await {
            Ok(bytes) => {
                tracing::info!(bytes = bytes, "source downloaded");
                Ok(bytes)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(destination).await;
                Err(err)
            }
        }
    }
}
