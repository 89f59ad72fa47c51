pub mod command;
pub mod dto;
pub mod engine_cache;
pub mod error;
pub mod gender;
pub mod pipeline;
pub mod rate_limiter;
pub mod speakers;
pub mod stage;
pub mod synthesis;
pub mod usecase;
pub mod validation;
pub mod workspace;

pub use command::*;
pub use dto::*;
pub use engine_cache::EngineCache;
pub use error::{DubbingError, SegmentError};
pub use gender::{GenderClassifier, GenderSettings};
pub use pipeline::{PipelineEngine, PipelineStage};
pub use rate_limiter::RateLimiter;
pub use synthesis::{
    CloningSynthesis, FallbackSynthesis, SegmentSynthesizer, SynthesisOutcome, SynthesisRequest,
    SynthesisRouter,
};
pub use usecase::*;
pub use workspace::JobWorkspace;
