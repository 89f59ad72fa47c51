use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::Utc;
use dubbing_domain::{DomainError, NeuralVoice};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;

use crate::protocol::{self, header_value};

const SERVICE: &str = "neural_voice";
const GEC_VERSION: &str = "1-130.0.2849.68";
const ORIGIN: &str = "chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0";

#[derive(Debug, Clone)]
pub struct EdgeVoiceSettings {
    pub endpoint: String,
    pub trusted_client_token: String,
    pub output_format: String,
    pub timeout: Duration,
}

/// Read-aloud neural voices over the Edge speech websocket. Each call opens
/// its own connection and writes the returned MP3 stream to disk.
pub struct EdgeNeuralVoice {
    settings: EdgeVoiceSettings,
}

impl EdgeNeuralVoice {
    pub fn new(settings: EdgeVoiceSettings) -> Self {
        Self { settings }
    }

    fn connection_url(&self, connection_id: &str) -> Result<Url, DomainError> {
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let mut url = Url::parse(&self.settings.endpoint).map_err(|err| {
            DomainError::invalid_input(&format!("invalid neural voice endpoint: {err}"))
        })?;
        url.query_pairs_mut()
            .append_pair("TrustedClientToken", &self.settings.trusted_client_token)
            .append_pair(
                "Sec-MS-GEC",
                &protocol::sec_ms_gec_token(unix_secs, &self.settings.trusted_client_token),
            )
            .append_pair("Sec-MS-GEC-Version", GEC_VERSION)
            .append_pair("ConnectionId", connection_id);
        Ok(url)
    }

    async fn stream_audio(&self, text: &str, voice: &str) -> Result<Vec<u8>, DomainError> {
        let connection_id = Uuid::new_v4().simple().to_string();
        let url = self.connection_url(&connection_id)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| DomainError::external_service_error(SERVICE, &err.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Origin", HeaderValue::from_static(ORIGIN));
        headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

        let (mut socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|err| DomainError::external_service_error(SERVICE, &err.to_string()))?;

        let now = Utc::now();
        let send_error = |err: tokio_tungstenite::tungstenite::Error| {
            DomainError::external_service_error(SERVICE, &err.to_string())
        };
        socket
            .send(Message::Text(
                protocol::speech_config_message(now, &self.settings.output_format).into(),
            ))
            .await
            .map_err(send_error)?;
        socket
            .send(Message::Text(
                protocol::ssml_message(now, &connection_id, &protocol::build_ssml(voice, text))
                    .into(),
            ))
            .await
            .map_err(send_error)?;

        let mut audio = Vec::new();
        while let Some(message) = socket.next().await {
            let message = message
                .map_err(|err| DomainError::external_service_error(SERVICE, &err.to_string()))?;
            match message {
                Message::Binary(frame) => {
                    if let Some(frame) = protocol::parse_binary_frame(&frame) {
                        if frame.path == Some("audio") {
                            audio.extend_from_slice(frame.payload);
                        }
                    }
                }
                Message::Text(frame) => {
                    let headers = frame.as_str().split("\r\n\r\n").next().unwrap_or_default();
                    if header_value(headers, "Path") == Some("turn.end") {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        let _ = socket.close(None).await;
        Ok(audio)
    }
}

#[async_trait]
impl NeuralVoice for EdgeNeuralVoice {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        destination: &Path,
    ) -> Result<(), DomainError> {
        let audio = tokio::time::timeout(self.settings.timeout, self.stream_audio(text, voice))
            .await
            .map_err(|_| {
                DomainError::external_service_error(
                    SERVICE,
                    &format!("timed out after {}s", self.settings.timeout.as_secs()),
                )
            })??;
        if audio.is_empty() {
            return Err(DomainError::external_service_error(
                SERVICE,
                "no audio was received",
            ));
        }
        tracing::debug!(voice = voice, bytes = audio.len(), "neural voice audio received");
        tokio::fs::write(destination, &audio).await?;
        Ok(())
    }
}
