//! Message codec
//!
//! Decodes inbound text frames into [`ClientMessage`] and encodes
//! [`ServerMessage`] for the wire. Decoding enforces the payload size cap,
//! requires a JSON object with a recognized `type` tag for the direction,
//! and ignores unknown fields.

use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::MAX_MESSAGE_BYTES;
use crate::protocol::{ClientMessage, ServerMessage};

/// Decode a client → server frame
pub fn decode_client(text: &str) -> Result<ClientMessage> {
    let value = parse_object(text)?;
    let tag = message_tag(&value)?;
    if !ClientMessage::is_known_type(tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }
    let tag = tag.to_string();
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        tag,
        reason: e.to_string(),
    })
}

/// Decode a server → client frame (used by tests and tooling)
pub fn decode_server(text: &str) -> Result<ServerMessage> {
    let value = parse_object(text)?;
    let tag = message_tag(&value)?;
    if !ServerMessage::is_known_type(tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }
    let tag = tag.to_string();
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        tag,
        reason: e.to_string(),
    })
}

/// Encode a server → client frame
pub fn encode_server(message: &ServerMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Encode a client → server frame (used by tests and tooling)
pub fn encode_client(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

fn parse_object(text: &str) -> Result<Value> {
    if text.len() > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_BYTES,
        });
    }
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    Ok(value)
}

fn message_tag(value: &Value) -> Result<&str> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ErrorKind, WsRole};

    #[test]
    fn client_round_trip() {
        let messages = [
            ClientMessage::Init {
                role: WsRole::Player,
                token: "abcd".into(),
            },
            ClientMessage::Death {
                score: 100,
                metadata: None,
            },
            ClientMessage::Answer {
                question_id: "q1".into(),
                answer_index: 2,
                time_ms: 3400,
            },
            ClientMessage::ScoreUpdate { score: 17 },
            ClientMessage::StartSession,
            ClientMessage::Pong,
        ];
        for msg in messages {
            let encoded = encode_client(&msg).unwrap();
            let decoded = decode_client(&encoded).unwrap();
            assert_eq!(
                encode_client(&decoded).unwrap(),
                encoded,
                "round trip changed {}",
                msg.tag()
            );
        }
    }

    #[test]
    fn server_round_trip() {
        let msg = ServerMessage::AnswerCorrect {
            bonus_earned: 100,
            total_score: 100,
            current_streak: 1,
            streak_multiplier: 1.0,
            comeback_credits: 1,
            comeback_start_score: 0,
            respawn: true,
        };
        let encoded = encode_server(&msg).unwrap();
        let decoded = decode_server(&encoded).unwrap();
        assert_eq!(encode_server(&decoded).unwrap(), encoded);
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(matches!(
            decode_client(r#"{"score": 100}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            decode_client(r#"[1, 2, 3]"#),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(decode_client("not json").is_err());
    }

    #[test]
    fn unknown_tags_are_rejected_per_direction() {
        // A server tag is not valid inbound
        assert!(matches!(
            decode_client(r#"{"type": "ping", "t": 1}"#),
            Err(ProtocolError::UnknownType(_))
        ));
        // A client tag is not valid outbound
        assert!(matches!(
            decode_server(r#"{"type": "death", "score": 1}"#),
            Err(ProtocolError::UnknownType(_))
        ));
        assert!(matches!(
            decode_client(r#"{"type": "frobnicate"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        assert!(matches!(
            decode_client(r#"{"type": "answer", "question_id": "q1"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let msg = decode_client(r#"{"type": "death", "score": 5, "extra": true}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Death { score: 5, .. }));
    }

    #[test]
    fn oversized_payloads_are_rejected() {
        let padding = "x".repeat(MAX_MESSAGE_BYTES);
        let huge = format!(r#"{{"type": "death", "score": 1, "pad": "{}"}}"#, padding);
        assert!(matches!(
            decode_client(&huge),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn error_codes_serialize_snake_case() {
        let encoded =
            encode_server(&ServerMessage::error(ErrorKind::PendingQuestion, "pending")).unwrap();
        assert!(encoded.contains(r#""code":"pending_question""#));
        assert!(encoded.contains(r#""type":"error""#));
    }
}
