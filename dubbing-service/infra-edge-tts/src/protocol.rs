use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Seconds between 1601-01-01 and the Unix epoch.
const WINDOWS_EPOCH_OFFSET_SECS: u64 = 11_644_473_600;
/// The token rotates every five minutes.
const TOKEN_WINDOW_SECS: u64 = 300;

/// Anti-abuse token expected in the `Sec-MS-GEC` query parameter: the
/// uppercase SHA-256 of the rounded Windows file time followed by the
/// trusted client token.
pub fn sec_ms_gec_token(unix_secs: u64, trusted_client_token: &str) -> String {
    let mut ticks = unix_secs + WINDOWS_EPOCH_OFFSET_SECS;
    ticks -= ticks % TOKEN_WINDOW_SECS;
    let file_time = u128::from(ticks) * 10_000_000;
    let digest = Sha256::digest(format!("{file_time}{trusted_client_token}").as_bytes());
    hex::encode_upper(digest)
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

pub(crate) fn speech_config_message(now: DateTime<Utc>, output_format: &str) -> String {
    let body = serde_json::json!({
        "context": {
            "synthesis": {
                "audio": {
                    "metadataoptions": {
                        "sentenceBoundaryEnabled": "false",
                        "wordBoundaryEnabled": "false"
                    },
                    "outputFormat": output_format
                }
            }
        }
    });
    format!(
        "X-Timestamp:{}\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n{}",
        timestamp(now),
        body
    )
}

pub(crate) fn ssml_message(now: DateTime<Utc>, request_id: &str, ssml: &str) -> String {
    format!(
        "X-RequestId:{request_id}\r\nContent-Type:application/ssml+xml\r\nX-Timestamp:{}Z\r\nPath:ssml\r\n\r\n{ssml}",
        timestamp(now)
    )
}

pub fn escape_ssml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c.is_control() && c != '\n' && c != '\t' => escaped.push(' '),
            c => escaped.push(c),
        }
    }
    escaped
}

/// The locale of the document is taken from the voice short name, e.g.
/// `hi-IN-SwaraNeural` speaks `hi-IN`.
pub fn build_ssml(voice: &str, text: &str) -> String {
    let locale = voice
        .splitn(3, '-')
        .take(2)
        .collect::<Vec<_>>()
        .join("-");
    let locale = if locale.contains('-') {
        locale
    } else {
        "en-US".to_string()
    };
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{locale}'>\
<voice name='{}'><prosody pitch='+0Hz' rate='+0%' volume='+0%'>{}</prosody></voice></speak>",
        escape_ssml(voice),
        escape_ssml(text)
    )
}

pub(crate) fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame<'a> {
    pub path: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Binary frames start with a big-endian `u16` header length, then the
/// header block, then the payload.
pub fn parse_binary_frame(frame: &[u8]) -> Option<AudioFrame<'_>> {
    if frame.len() < 2 {
        return None;
    }
    let header_len = usize::from(u16::from_be_bytes([frame[0], frame[1]]));
    let body = &frame[2..];
    if body.len() < header_len {
        return None;
    }
    let headers = std::str::from_utf8(&body[..header_len]).ok()?;
    Some(AudioFrame {
        path: header_value(headers, "Path"),
        payload: &body[header_len..],
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn token_is_stable_within_a_five_minute_window() {
        let token = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";
        let first = sec_ms_gec_token(1_700_000_100, token);
        let second = sec_ms_gec_token(1_700_000_199, token);
        let next = sec_ms_gec_token(1_700_000_400, token);
        assert_eq!(first, second);
        assert_ne!(first, next);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn ssml_escapes_markup_and_uses_voice_locale() {
        let ssml = build_ssml("ta-IN-PallaviNeural", "salt & <pepper>");
        assert!(ssml.contains("xml:lang='ta-IN'"));
        assert!(ssml.contains("<voice name='ta-IN-PallaviNeural'>"));
        assert!(ssml.contains("salt &amp; &lt;pepper&gt;"));
    }

    #[test]
    fn binary_frames_split_header_and_payload() {
        let header = b"X-RequestId:abc\r\nContent-Type:audio/mpeg\r\nPath:audio\r\n";
        let mut frame = (header.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(header);
        frame.extend_from_slice(&[0xFF, 0xF3, 0x01]);

        let parsed = parse_binary_frame(&frame).expect("frame");
        assert_eq!(parsed.path, Some("audio"));
        assert_eq!(parsed.payload, &[0xFF, 0xF3, 0x01]);
    }

    #[test]
    fn truncated_frames_are_rejected() {
        assert_eq!(parse_binary_frame(&[0x00]), None);
        assert_eq!(parse_binary_frame(&[0x00, 0x10, b'P']), None);
    }

    #[test]
    fn timestamps_use_javascript_date_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).single().expect("date");
        assert_eq!(
            timestamp(now),
            "Tue Mar 05 2024 07:08:09 GMT+0000 (Coordinated Universal Time)"
        );
    }
}
