mod protocol;
mod voice;

pub use protocol::{build_ssml, escape_ssml, parse_binary_frame, sec_ms_gec_token, AudioFrame};
pub use voice::{EdgeNeuralVoice, EdgeVoiceSettings};
