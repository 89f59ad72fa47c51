pub mod demucs;
pub mod ffmpeg;
pub mod pitch;
pub mod process;
pub mod rate_store;
pub mod wav;

pub use demucs::{DemucsSeparator, DemucsSettings};
pub use ffmpeg::{FfmpegAudioCodec, FfmpegAudioExtractor, FfmpegMixer};
pub use pitch::{YinPitchTracker, YinSettings};
pub use process::ProcessRunner;
pub use rate_store::{InMemoryRateRecordStore, RedisRateRecordStore};
