mod client;
mod cloning;
mod provider;
mod speech;
mod translate;

pub use client::SidecarClient;
pub use cloning::SidecarCloningSynthesizer;
pub use provider::{SidecarEngineProvider, SidecarSettings};
pub use speech::{SidecarAligner, SidecarDiarizer, SidecarRecognizer};
pub use translate::GoogleTranslator;
