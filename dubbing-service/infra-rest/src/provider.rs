use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{
    Aligner, CloningSynthesizer, Diarizer, DomainError, EngineProvider, Recognizer,
};
use serde::{Deserialize, Serialize};

use crate::{
    SidecarAligner, SidecarClient, SidecarCloningSynthesizer, SidecarDiarizer, SidecarRecognizer,
};

#[derive(Debug, Clone)]
pub struct SidecarSettings {
    pub recognizer_model: String,
    pub compute_type: String,
    pub batch_size: u32,
    pub chunk_size: u32,
    pub cloning_model: String,
    pub hf_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compute_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hf_token: Option<&'a str>,
}

impl<'a> LoadRequest<'a> {
    fn kind(kind: &'a str) -> Self {
        Self {
            kind,
            model: None,
            compute_type: None,
            language: None,
            hf_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    handle: String,
}

/// Loads engines inside the sidecar and hands back thin clients bound to the
/// returned handles. A local recognizer can be swapped in with
/// [`SidecarEngineProvider::with_recognizer`].
pub struct SidecarEngineProvider {
    speech: SidecarClient,
    cloning: SidecarClient,
    settings: SidecarSettings,
    local_recognizer: Option<Arc<dyn Recognizer>>,
}

impl SidecarEngineProvider {
    pub fn new(speech: SidecarClient, cloning: SidecarClient, settings: SidecarSettings) -> Self {
        Self {
            speech,
            cloning,
            settings,
            local_recognizer: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.local_recognizer = Some(recognizer);
        self
    }

    async fn load(
        &self,
        client: &SidecarClient,
        service: &str,
        request: LoadRequest<'_>,
    ) -> Result<String, DomainError> {
        let response: LoadResponse = client.post_json(service, "/v1/models/load", &request).await?;
        if response.handle.trim().is_empty() {
            return Err(DomainError::external_service_error(
                service,
                "model load returned an empty handle",
            ));
        }
        tracing::info!(service = service, handle = %response.handle, "sidecar model loaded");
        Ok(response.handle)
    }
}

#[async_trait]
impl EngineProvider for SidecarEngineProvider {
    async fn load_recognizer(&self) -> Result<Arc<dyn Recognizer>, DomainError> {
        if let Some(recognizer) = &self.local_recognizer {
            return Ok(recognizer.clone());
        }
        let handle = self
            .load(
                &self.speech,
                "recognizer",
                LoadRequest {
                    model: Some(self.settings.recognizer_model.as_str()),
                    compute_type: Some(self.settings.compute_type.as_str()),
                    ..LoadRequest::kind("recognizer")
                },
            )
            .await?;
        Ok(Arc::new(SidecarRecognizer::new(
            self.speech.clone(),
            handle,
            self.settings.batch_size,
            self.settings.chunk_size,
        )))
    }

    async fn load_aligner(&self, language: &str) -> Result<Arc<dyn Aligner>, DomainError> {
        let handle = self
            .load(
                &self.speech,
                "aligner",
                LoadRequest {
                    language: Some(language),
                    ..LoadRequest::kind("aligner")
                },
            )
            .await?;
        Ok(Arc::new(SidecarAligner::new(self.speech.clone(), handle)))
    }

    async fn load_diarizer(&self) -> Result<Arc<dyn Diarizer>, DomainError> {
        let handle = self
            .load(
                &self.speech,
                "diarizer",
                LoadRequest {
                    hf_token: self.settings.hf_token.as_deref(),
                    ..LoadRequest::kind("diarizer")
                },
            )
            .await?;
        Ok(Arc::new(SidecarDiarizer::new(self.speech.clone(), handle)))
    }

    async fn load_cloning_synthesizer(&self) -> Result<Arc<dyn CloningSynthesizer>, DomainError> {
        let handle = self
            .load(
                &self.cloning,
                "cloning",
                LoadRequest {
                    model: Some(self.settings.cloning_model.as_str()),
                    ..LoadRequest::kind("cloning")
                },
            )
            .await?;
        Ok(Arc::new(SidecarCloningSynthesizer::new(
            self.cloning.clone(),
            handle,
        )))
    }
}
