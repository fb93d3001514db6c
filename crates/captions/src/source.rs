//! Caption payload parsers
//!
//! Turns platform caption payloads into [`CaptionFragment`]s:
//! - YouTube timed text (`fmt=json3`): `events[].segs[].utf8`
//! - Bilibili subtitle JSON: `body[] { from, to, content }`
//! - a plain JSON array of fragments (`[{start, dur, text}]`)

use clipsight_common::{ClipsightError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::types::CaptionFragment;

#[derive(Debug, Deserialize)]
struct Json3Payload {
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: f64,
    #[serde(default)]
    d_duration_ms: f64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BilibiliPayload {
    body: Vec<BilibiliLine>,
}

#[derive(Debug, Deserialize)]
struct BilibiliLine {
    from: f64,
    to: f64,
    content: String,
}

/// Parse a YouTube `json3` timed-text payload
///
/// Every segment of an event inherits the event's timing.
pub fn parse_youtube_json3(payload: &str) -> Result<Vec<CaptionFragment>> {
    let parsed: Json3Payload = serde_json::from_str(payload).map_err(|e| {
        ClipsightError::invalid_input(format!("Caption payload has no events array: {}", e))
    })?;

    let fragments: Vec<_> = parsed
        .events
        .iter()
        .flat_map(|event| {
            event.segs.iter().filter_map(move |seg| {
                let text = seg.utf8.as_deref()?.replace('\n', " ");
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(CaptionFragment::new(
                    event.t_start_ms / 1000.0,
                    event.d_duration_ms / 1000.0,
                    text,
                ))
            })
        })
        .collect();

    debug!("Parsed {} fragments from json3 payload", fragments.len());
    Ok(fragments)
}

/// Parse a Bilibili subtitle payload
pub fn parse_bilibili(payload: &str) -> Result<Vec<CaptionFragment>> {
    let parsed: BilibiliPayload = serde_json::from_str(payload).map_err(|e| {
        ClipsightError::invalid_input(format!("Caption payload has no body array: {}", e))
    })?;

    Ok(parsed
        .body
        .into_iter()
        .map(|line| CaptionFragment::new(line.from, line.to - line.from, line.content.trim()))
        .collect())
}

/// Detect the payload format and parse it
pub fn parse_captions(payload: &str) -> Result<Vec<CaptionFragment>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ClipsightError::invalid_input(format!("Caption payload is not JSON: {}", e)))?;

    match &value {
        Value::Object(map) if map.contains_key("events") => parse_youtube_json3(payload),
        Value::Object(map) if map.contains_key("body") => parse_bilibili(payload),
        Value::Array(_) => serde_json::from_value(value).map_err(|e| {
            ClipsightError::invalid_input(format!("Invalid caption fragment list: {}", e))
        }),
        _ => Err(ClipsightError::invalid_input(
            "Unrecognised caption payload format",
        )),
    }
}
