//! Streaming-controller payloads, e.g. `streamController.enqueue("...")`.
//!
//! The data arrives as a quoted JS string literal holding JSON, so every
//! literal is cut out of the page, unescaped, and parsed on its own.

use serde_json::Value;

use super::json_walk::walk;
use super::primitives::unescape_backslashes;
use super::Strategy;
use crate::config::{Fundraiser, MIN_STREAM_PAYLOAD_LEN};
use crate::types::FundraiserRecord;

const CALL_MARKER: &str = "enqueue(";

pub struct StreamPayload;

impl Strategy for StreamPayload {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn try_extract(&self, body: &str, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
        enqueue_payloads(body)
            .into_iter()
            .map(str::trim)
            .filter(|p| p.len() >= MIN_STREAM_PAYLOAD_LEN)
            .filter_map(decode_payload)
            .find_map(|data| {
                let (amounts, details) = walk(&data)?;
                amounts.into_record(details, fundraiser)
            })
    }
}

/// Raw (still escaped) contents of every quoted argument following the call
/// marker, in page order.
///
/// A backslash and the character after it are copied as-is, so an escaped
/// quote never ends the string. An unterminated string ends the scan.
pub fn enqueue_payloads(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(CALL_MARKER) {
        let mut i = pos + found + CALL_MARKER.len();
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let quote = bytes[i];
        if quote != b'"' && quote != b'\'' {
            // Step over the whole character; page text is often Polish.
            pos = i + text[i..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        i += 1;
        let start = i;
        let mut end = None;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => i += 2,
                b if b == quote => {
                    end = Some(i);
                    break;
                }
                _ => i += 1,
            }
        }
        let Some(end) = end else { break };
        out.push(&text[start..end]);
        pos = end + 1;
    }
    out
}

/// Payloads are JS string literals; unescape first, fall back to the raw text.
fn decode_payload(raw: &str) -> Option<Value> {
    let unescaped = unescape_backslashes(raw);
    serde_json::from_str(&unescaped)
        .or_else(|_| serde_json::from_str(raw))
        .ok()
}
