//! Native-messaging host: length-prefixed JSON frames over stdio.
//!
//! Each frame is a little-endian u32 byte length followed by a UTF-8 JSON
//! envelope `{id, type, version, payload}`. Replies echo the id with
//! `{id, ok, data}` or `{id, ok: false, error: {code, message}}`. Unknown
//! message types answer `invalid_request` instead of closing the stream.

use crate::engine::{HelperEngine, HELPER_VERSION};
use lexishift_rulegen::SUPPORTED_PAIRS;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are refused; browsers cap native messages well
/// below it.
pub const MAX_FRAME_BYTES: u32 = 32 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Value,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub payload: Value,
}

/// Read one frame; Ok(None) on clean EOF at a frame boundary.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Option<Value>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    let value = serde_json::from_slice(&body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Write one frame.
pub fn write_message<W: Write>(writer: &mut W, message: &Value) -> io::Result<()> {
    let body = serde_json::to_vec(message)?;
    let len = body.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()
}

fn ok_reply(id: Value, data: Value) -> Value {
    json!({"id": id, "ok": true, "data": data})
}

fn error_reply(id: Value, code: &str, message: String) -> Value {
    json!({"id": id, "ok": false, "error": {"code": code, "message": message}})
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn path_field(payload: &Value, key: &str) -> Option<PathBuf> {
    str_field(payload, key).map(PathBuf::from)
}

/// Dispatch one envelope against the engine.
pub fn handle_envelope(engine: &HelperEngine, envelope: Envelope) -> Value {
    let Envelope {
        id,
        msg_type,
        payload,
        ..
    } = envelope;
    debug!(msg_type = %msg_type, "handling message");

    let require_pair = || -> Result<&str, Value> {
        str_field(&payload, "pair").ok_or_else(|| {
            error_reply(
                id.clone(),
                "invalid_request",
                format!("{} requires a pair field", msg_type),
            )
        })
    };

    let result = match msg_type.as_str() {
        "hello" => Ok(json!({
            "helper_version": HELPER_VERSION,
            "protocol_version": PROTOCOL_VERSION,
            "supported_pairs": SUPPORTED_PAIRS,
        })),
        "status" => engine.status(),
        "profiles_get" => engine.profiles(),
        "open_data_dir" => Ok(json!({"data_root": engine.data_root()})),
        "get_snapshot" => match require_pair() {
            Ok(pair) => engine.load_snapshot(pair),
            Err(reply) => return reply,
        },
        "get_ruleset" => match require_pair() {
            Ok(pair) => engine.load_ruleset(pair),
            Err(reply) => return reply,
        },
        "srs_diagnostics" => match require_pair() {
            Ok(pair) => engine.srs_diagnostics(pair),
            Err(reply) => return reply,
        },
        "trigger_rulegen" => match require_pair() {
            Ok(pair) => engine.run_rulegen_job(
                pair,
                path_field(&payload, "dictionary"),
                path_field(&payload, "frequency_db"),
            ),
            Err(reply) => return reply,
        },
        "srs_initialize" => match require_pair() {
            Ok(pair) => engine.initialize_srs_set(
                pair,
                payload.get("set_top_n").and_then(Value::as_i64),
                payload.get("initial_active_count").and_then(Value::as_i64),
            ),
            Err(reply) => return reply,
        },
        "srs_plan_set" => engine.plan_srs_set(payload.clone()),
        "srs_refresh" => match require_pair() {
            Ok(pair) => engine.refresh_srs_set(pair),
            Err(reply) => return reply,
        },
        "srs_reset" => engine.reset_srs_data(str_field(&payload, "pair")),
        "record_feedback" => {
            match (
                str_field(&payload, "pair"),
                str_field(&payload, "lemma"),
                str_field(&payload, "rating"),
            ) {
                (Some(pair), Some(lemma), Some(rating)) => {
                    engine.record_feedback(pair, lemma, rating)
                }
                _ => {
                    return error_reply(
                        id,
                        "invalid_request",
                        "record_feedback requires pair, lemma and rating".to_string(),
                    )
                }
            }
        }
        "record_exposure" => {
            match (str_field(&payload, "pair"), str_field(&payload, "lemma")) {
                (Some(pair), Some(lemma)) => engine.record_exposure(pair, lemma),
                _ => {
                    return error_reply(
                        id,
                        "invalid_request",
                        "record_exposure requires pair and lemma".to_string(),
                    )
                }
            }
        }
        other => {
            return error_reply(
                id,
                "invalid_request",
                format!("unknown message type {}", other),
            )
        }
    };

    match result {
        Ok(data) => ok_reply(id, data),
        Err(e) => error_reply(id, e.code(), e.to_string()),
    }
}

/// Serve frames until EOF.
pub fn serve<R: Read, W: Write>(
    engine: &HelperEngine,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<()> {
    while let Some(message) = read_message(reader)? {
        let reply = match serde_json::from_value::<Envelope>(message) {
            Ok(envelope) => handle_envelope(engine, envelope),
            Err(e) => {
                warn!(error = %e, "unparseable envelope");
                error_reply(Value::Null, "invalid_request", e.to_string())
            }
        };
        write_message(writer, &reply)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> HelperEngine {
        HelperEngine::with_root(dir.path().join("data"), "default").unwrap()
    }

    fn envelope(msg_type: &str, payload: Value) -> Envelope {
        Envelope {
            id: json!(1),
            msg_type: msg_type.to_string(),
            version: Some(1),
            payload,
        }
    }

    #[test]
    fn framing_roundtrip() {
        let message = json!({"id": 7, "type": "hello", "payload": {}});
        let mut buf = Vec::new();
        write_message(&mut buf, &message).unwrap();
        assert_eq!(
            u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize,
            buf.len() - 4
        );
        let mut cursor = Cursor::new(buf);
        let back = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(back, message);
        // stream exhausted at a frame boundary
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_refused() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_le_bytes());
        let mut cursor = Cursor::new(buf);
        assert!(read_message(&mut cursor).is_err());
    }

    #[test]
    fn hello_reports_identity() {
        let dir = TempDir::new().unwrap();
        let reply = handle_envelope(&engine(&dir), envelope("hello", json!({})));
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["helper_version"], HELPER_VERSION);
        assert!(reply["data"]["supported_pairs"]
            .as_array()
            .unwrap()
            .contains(&json!("en-ja")));
    }

    #[test]
    fn unknown_type_is_invalid_request() {
        let dir = TempDir::new().unwrap();
        let reply = handle_envelope(&engine(&dir), envelope("bogus", json!({})));
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["error"]["code"], "invalid_request");
        assert_eq!(reply["id"], 1);
    }

    #[test]
    fn missing_pair_is_invalid_request() {
        let dir = TempDir::new().unwrap();
        let reply = handle_envelope(&engine(&dir), envelope("srs_diagnostics", json!({})));
        assert_eq!(reply["error"]["code"], "invalid_request");
    }

    #[test]
    fn engine_errors_map_to_codes() {
        let dir = TempDir::new().unwrap();
        let reply = handle_envelope(
            &engine(&dir),
            envelope("get_snapshot", json!({"pair": "en-ja"})),
        );
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["error"]["code"], "input_missing");

        let reply = handle_envelope(
            &engine(&dir),
            envelope("srs_diagnostics", json!({"pair": "en-fr"})),
        );
        assert_eq!(reply["error"]["code"], "pair_unsupported");
    }

    #[test]
    fn serve_answers_every_frame() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut input = Vec::new();
        write_message(&mut input, &json!({"id": 1, "type": "hello"})).unwrap();
        write_message(&mut input, &json!({"id": 2, "type": "status"})).unwrap();

        let mut reader = Cursor::new(input);
        let mut output = Vec::new();
        serve(&engine, &mut reader, &mut output).unwrap();

        let mut cursor = Cursor::new(output);
        let first = read_message(&mut cursor).unwrap().unwrap();
        let second = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert_eq!(second["ok"], true);
    }

    #[test]
    fn plan_over_the_wire() {
        let dir = TempDir::new().unwrap();
        let reply = handle_envelope(
            &engine(&dir),
            envelope(
                "srs_plan_set",
                json!({"pair": "en-ja", "strategy": "frequency_bootstrap"}),
            ),
        );
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["can_execute"], true);
        assert_eq!(reply["data"]["bootstrap_top_n"], 800);
    }
}
