//! Wire format for signaling messages.
//!
//! Messages travel as JSON text frames. The field names (`sdpMid`,
//! `sdpMLineIndex`) are fixed by the deployed peers, so serialization goes
//! through a private envelope struct that pins them exactly.

use serde::{Deserialize, Serialize};

/// A decoded signaling message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    /// SDP offer from the caller
    Offer { sdp: String },
    /// SDP answer from the callee
    Answer { sdp: String },
    /// A single ICE candidate
    Ice {
        candidate: String,
        sdp_mid: String,
        sdp_mline_index: u16,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed signal payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown signal type `{0}`")]
    UnknownType(String),
    #[error("`{kind}` signal missing required field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// On-the-wire shape. Every known message is a flat object with a `type` tag
/// and optional payload fields.
#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    #[serde(default, rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    sdp_mline_index: Option<u16>,
}

impl From<&SignalMessage> for WireMessage {
    fn from(message: &SignalMessage) -> Self {
        match message {
            SignalMessage::Offer { sdp } => WireMessage {
                kind: "offer".to_string(),
                sdp: Some(sdp.clone()),
                candidate: None,
                sdp_mid: None,
                sdp_mline_index: None,
            },
            SignalMessage::Answer { sdp } => WireMessage {
                kind: "answer".to_string(),
                sdp: Some(sdp.clone()),
                candidate: None,
                sdp_mid: None,
                sdp_mline_index: None,
            },
            SignalMessage::Ice {
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => WireMessage {
                kind: "ice".to_string(),
                sdp: None,
                candidate: Some(candidate.clone()),
                sdp_mid: Some(sdp_mid.clone()),
                sdp_mline_index: Some(*sdp_mline_index),
            },
        }
    }
}

/// Serialize a message to its wire text.
pub fn encode(message: &SignalMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireMessage::from(message))
}

/// Parse wire text into a [`SignalMessage`].
///
/// Unknown `type` tags and missing required fields are reported as typed
/// errors so callers can drop the frame without tearing anything down.
pub fn decode(text: &str) -> Result<SignalMessage, DecodeError> {
    let wire: WireMessage = serde_json::from_str(text)?;
    match wire.kind.as_str() {
        "offer" => {
            let sdp = wire.sdp.ok_or(DecodeError::MissingField {
                kind: "offer",
                field: "sdp",
            })?;
            Ok(SignalMessage::Offer { sdp })
        }
        "answer" => {
            let sdp = wire.sdp.ok_or(DecodeError::MissingField {
                kind: "answer",
                field: "sdp",
            })?;
            Ok(SignalMessage::Answer { sdp })
        }
        "ice" => {
            let candidate = wire.candidate.ok_or(DecodeError::MissingField {
                kind: "ice",
                field: "candidate",
            })?;
            let sdp_mid = wire.sdp_mid.ok_or(DecodeError::MissingField {
                kind: "ice",
                field: "sdpMid",
            })?;
            let sdp_mline_index = wire.sdp_mline_index.ok_or(DecodeError::MissingField {
                kind: "ice",
                field: "sdpMLineIndex",
            })?;
            Ok(SignalMessage::Ice {
                candidate,
                sdp_mid,
                sdp_mline_index,
            })
        }
        other => Err(DecodeError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_round_trip() {
        let message = SignalMessage::Offer {
            sdp: "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n".to_string(),
        };
        let text = encode(&message).unwrap();
        assert_eq!(decode(&text).unwrap(), message);
    }

    #[test]
    fn answer_round_trip() {
        let message = SignalMessage::Answer {
            sdp: "a=".to_string(),
        };
        let text = encode(&message).unwrap();
        assert_eq!(decode(&text).unwrap(), message);
    }

    #[test]
    fn ice_round_trip() {
        let message = SignalMessage::Ice {
            candidate: "candidate:1 1 udp 2130706431 192.0.2.1 54400 typ host".to_string(),
            sdp_mid: "0".to_string(),
            sdp_mline_index: 0,
        };
        let text = encode(&message).unwrap();
        assert_eq!(decode(&text).unwrap(), message);
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let message = SignalMessage::Ice {
            candidate: "c".to_string(),
            sdp_mid: "audio".to_string(),
            sdp_mline_index: 1,
        };
        let value: serde_json::Value = serde_json::from_str(&encode(&message).unwrap()).unwrap();
        assert_eq!(value["type"], "ice");
        assert_eq!(value["sdpMid"], "audio");
        assert_eq!(value["sdpMLineIndex"], 1);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn unknown_type_is_reported() {
        let result = decode(r#"{"type":"bye"}"#);
        assert!(matches!(result, Err(DecodeError::UnknownType(kind)) if kind == "bye"));
    }

    #[test]
    fn missing_sdp_is_reported() {
        let result = decode(r#"{"type":"offer"}"#);
        assert!(matches!(
            result,
            Err(DecodeError::MissingField { kind: "offer", field: "sdp" })
        ));
    }

    #[test]
    fn null_required_field_is_reported() {
        let result = decode(r#"{"type":"ice","candidate":"c","sdpMid":null,"sdpMLineIndex":0}"#);
        assert!(matches!(
            result,
            Err(DecodeError::MissingField { kind: "ice", field: "sdpMid" })
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let decoded = decode(r#"{"type":"answer","sdp":"a=","session":"abc"}"#).unwrap();
        assert_eq!(
            decoded,
            SignalMessage::Answer {
                sdp: "a=".to_string()
            }
        );
    }
}
