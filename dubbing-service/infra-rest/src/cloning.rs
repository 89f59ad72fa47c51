use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use dubbing_domain::{AudioClip, CloningSynthesizer, DomainError};
use dubbing_infra::wav;
use serde::Serialize;

use crate::SidecarClient;

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    handle: &'a str,
    text: &'a str,
    speaker_wav: String,
    language: &'a str,
}

/// Zero-shot cloning synthesizer; the sidecar answers with a WAV body.
pub struct SidecarCloningSynthesizer {
    client: SidecarClient,
    handle: String,
}

impl SidecarCloningSynthesizer {
    pub fn new(client: SidecarClient, handle: String) -> Self {
        Self { client, handle }
    }
}

#[async_trait]
impl CloningSynthesizer for SidecarCloningSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
    ) -> Result<AudioClip, DomainError> {
        let body = self
            .client
            .post_for_bytes(
                "cloning",
                "/v1/tts",
                &TtsRequest {
                    handle: &self.handle,
                    text,
                    speaker_wav: reference.to_string_lossy().into_owned(),
                    language,
                },
            )
            .await?;
        if body.is_empty() {
            return Err(DomainError::external_service_error(
                "cloning",
                "empty audio body",
            ));
        }
        wav::read_wav_from(Cursor::new(body))
    }
}
