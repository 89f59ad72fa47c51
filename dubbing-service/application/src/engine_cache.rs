use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dubbing_domain::{
    Aligner, CloningSynthesizer, Diarizer, DomainError, EngineProvider, Recognizer,
};
use tokio::sync::OnceCell;

type AlignerCell = Arc<OnceCell<Arc<dyn Aligner>>>;

/// Process-wide engine handles, each constructed at most once.
///
/// Concurrent first requests for the same capability wait on a single
/// construction. A failed construction leaves the slot empty so a later job
/// can retry.
pub struct EngineCache {
    provider: Arc<dyn EngineProvider>,
    recognizer: OnceCell<Arc<dyn Recognizer>>,
    diarizer: OnceCell<Arc<dyn Diarizer>>,
    cloning: OnceCell<Arc<dyn CloningSynthesizer>>,
    aligners: Mutex<HashMap<String, AlignerCell>>,
}

impl EngineCache {
    pub fn new(provider: Arc<dyn EngineProvider>) -> Self {
        Self {
            provider,
            recognizer: OnceCell::new(),
            diarizer: OnceCell::new(),
            cloning: OnceCell::new(),
            aligners: Mutex::new(HashMap::new()),
        }
    }

    pub async fn recognizer(&self) -> Result<Arc<dyn Recognizer>, DomainError> {
        self.recognizer
            .get_or_try_init(|| async {
                tracing::info!(engine = "recognizer", "loading engine");
                self.provider.load_recognizer().await
            })
            .await
            .map(Arc::clone)
    }

    pub async fn diarizer(&self) -> Result<Arc<dyn Diarizer>, DomainError> {
        self.diarizer
            .get_or_try_init(|| async {
                tracing::info!(engine = "diarizer", "loading engine");
                self.provider.load_diarizer().await
            })
            .await
            .map(Arc::clone)
    }

    pub async fn cloning_synthesizer(&self) -> Result<Arc<dyn CloningSynthesizer>, DomainError> {
        self.cloning
            .get_or_try_init(|| async {
                tracing::info!(engine = "cloning_synthesizer", "loading engine");
                self.provider.load_cloning_synthesizer().await
            })
            .await
            .map(Arc::clone)
    }

    /// Alignment models are language specific, so one slot is kept per language.
    pub async fn aligner(&self, language: &str) -> Result<Arc<dyn Aligner>, DomainError> {
        let language = language.trim().to_ascii_lowercase();
        let cell = {
            let mut aligners = self
                .aligners
                .lock()
                .map_err(|_| DomainError::internal_error("aligner cache lock poisoned"))?;
            aligners
                .entry(language.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_try_init(|| async {
            tracing::info!(engine = "aligner", language = %language, "loading engine");
            self.provider.load_aligner(&language).await
        })
        .await
        .map(Arc::clone)
    }
}
