use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dubbing_domain::{DomainError, ObjectStore};
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, MultipartUpload, PutMultipartOpts, PutPayload,
};
use tokio_util::io::ReaderStream;

const SERVICE: &str = "storage";
/// S3 rejects non-final parts under 5 MiB.
const PART_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub presign_ttl: Duration,
}

/// Publishes results to an S3-compatible bucket and hands out presigned GET URLs.
pub struct S3ObjectStore {
    store: Arc<dyn object_store::ObjectStore>,
    signer: Arc<dyn Signer>,
    presign_ttl: Duration,
}

impl S3ObjectStore {
    pub fn new(
        store: Arc<dyn object_store::ObjectStore>,
        signer: Arc<dyn Signer>,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            presign_ttl,
        }
    }

    pub fn from_settings(settings: &S3Settings) -> Result<Self, DomainError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(key) = &settings.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &settings.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        let s3 = builder.build().map_err(|err| {
            DomainError::invalid_input(&format!("invalid storage settings: {err}"))
        })?;
        let s3 = Arc::new(s3);
        Ok(Self::new(s3.clone(), s3, settings.presign_ttl))
    }

    async fn upload(&self, file: &Path, path: &StorePath) -> Result<u64, DomainError> {
        let source = tokio::fs::File::open(file).await?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from("video/mp4"));
        let mut upload = self
            .store
            .put_multipart_opts(
                path,
                PutMultipartOpts {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .map_err(storage_error)?;

        let mut stream = ReaderStream::with_capacity(source, 1024 * 1024);
        let mut part: Vec<u8> = Vec::with_capacity(PART_SIZE);
        let mut total: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = upload.abort().await;
                    return Err(err.into());
                }
            };
            total += chunk.len() as u64;
            part.extend_from_slice(&chunk);
            if part.len() >= PART_SIZE {
                let payload = PutPayload::from(std::mem::take(&mut part));
                if let Err(err) = upload.put_part(payload).await {
                    let _ = upload.abort().await;
                    return Err(storage_error(err));
                }
            }
        }
        if !part.is_empty() {
            if let Err(err) = upload.put_part(PutPayload::from(part)).await {
                let _ = upload.abort().await;
                return Err(storage_error(err));
            }
        }
        upload.complete().await.map_err(storage_error)?;
        Ok(total)
    }
}

fn storage_error(err: object_store::Error) -> DomainError {
    DomainError::external_service_error(SERVICE, &err.to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn publish(&self, file: &Path, key: &str) -> Result<String, DomainError> {
        let path = StorePath::parse(key)
            .map_err(|err| DomainError::invalid_input(&format!("invalid object key: {err}")))?;
        let bytes = self.upload(file, &path).await?;
        let url = self
            .signer
            .signed_url(http::Method::GET, &path, self.presign_ttl)
            .await
            .map_err(storage_error)?;
        tracing::info!(key = key, bytes = bytes, "result published");
        Ok(url.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let path = StorePath::parse(key)
            .map_err(|err| DomainError::invalid_input(&format!("invalid object key: {err}")))?;
        self.store.delete(&path).await.map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn s3_urls_are_presigned_for_the_configured_ttl() {
        let store = S3ObjectStore::from_settings(&S3Settings {
            bucket: "media".to_string(),
            endpoint: Some("http://127.0.0.1:9000".to_string()),
            region: "auto".to_string(),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            presign_ttl: Duration::from_secs(3_600),
        })
        .expect("store");

        let url = store
            .signer
            .signed_url(
                http::Method::GET,
                &StorePath::from("dubbed/job_1.mp4"),
                store.presign_ttl,
            )
            .await
            .expect("signed url");

        let url = url.to_string();
        assert!(url.contains("dubbed/job_1.mp4"), "url {url}");
        assert!(url.contains("X-Amz-Expires=3600"), "url {url}");
        assert!(url.contains("X-Amz-Signature="), "url {url}");
    }
}
