mod acquire;
mod extract;
mod mix;
mod publish;
mod separate;
mod synthesize;
mod transcribe;
mod translate;

pub use acquire::AcquireStage;
pub use extract::ExtractAudioStage;
pub use mix::MixStage;
pub use publish::{result_object_key, PublishStage};
pub use separate::{locate_stems, SeparateStage};
pub use synthesize::SynthesizeStage;
pub use transcribe::TranscribeStage;
pub use translate::TranslateStage;
