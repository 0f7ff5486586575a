//! Scan payload decoding and encoding.
//!
//! A scanned QR code carries either a bare identifier (`"12345"`) or a JSON
//! object `{"idNumber": "...", "checksum": "..."}`. Older registration codes
//! carry `{"id": "...", "name": "...", "chapter": "..."}`. Decoding never
//! fails: anything unrecognised is treated as an opaque identifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of decoding one raw scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub identifier: String,
    pub checksum: Option<String>,
    pub verified: bool,
}

impl DecodedPayload {
    /// A checksum was supplied but does not match the identifier
    pub fn checksum_mismatch(&self) -> bool {
        self.checksum.is_some() && !self.verified
    }
}

#[derive(Deserialize)]
struct StructuredPayload {
    #[serde(rename = "idNumber")]
    id_number: Option<Value>,
    // Legacy registration codes
    id: Option<Value>,
    checksum: Option<Value>,
}

/// Decode raw scan text. Pure and total.
pub fn decode(raw: &str) -> DecodedPayload {
    let (identifier, checksum) = match parse_structured(raw) {
        Some(parsed) => parsed,
        None => (raw.trim().to_string(), None),
    };

    let verified = checksum
        .as_deref()
        .is_some_and(|given| given == compute_checksum(&identifier));

    DecodedPayload {
        identifier,
        checksum,
        verified,
    }
}

fn parse_structured(raw: &str) -> Option<(String, Option<String>)> {
    let value: Value = serde_json::from_str(raw).ok()?;
    if !value.is_object() {
        return None;
    }
    let payload: StructuredPayload = serde_json::from_value(value).ok()?;

    let id_value = payload
        .id_number
        .filter(|v| !v.is_null())
        .or(payload.id.filter(|v| !v.is_null()))?;

    let identifier = stringify(&id_value).trim().to_string();
    let checksum = payload.checksum.filter(|v| !v.is_null()).map(|v| stringify(&v));

    Some((identifier, checksum))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Checksum of an identifier: base-36 of the sum of its UTF-16 code units.
///
/// `"AB"` → 65 + 66 = 131 → `"3n"`.
pub fn compute_checksum(identifier: &str) -> String {
    let sum: u64 = identifier.encode_utf16().map(u64::from).sum();
    to_base36(sum)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Build the JSON payload printed into a QR code for `identifier`
pub fn encode(identifier: &str) -> String {
    serde_json::json!({
        "idNumber": identifier,
        "checksum": compute_checksum(identifier),
    })
    .to_string()
}
