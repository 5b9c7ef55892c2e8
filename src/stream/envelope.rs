//! Envelopes decoded from the server event stream
//!
//! Each SSE `data:` payload is one JSON object discriminated by its `type`
//! field. Decoding normalizes the wire shape into a closed [`Envelope`] enum
//! so the interpreter never touches raw JSON.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One decoded event
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Server checkpoint to attach to later requests
    Continuity { checkpoint_id: String },
    /// Fragment of the assistant's answer
    ContentDelta { text: String },
    SearchBegin { query: String },
    SearchResults { urls: Vec<String> },
    SearchFailure { error: String },
    /// End of the response
    Terminal,
    /// Well-formed event of a kind this client does not handle
    Unrecognized { kind: String, payload: Value },
}

impl Envelope {
    /// Wire name of the event kind, for logging
    pub fn kind(&self) -> &str {
        match self {
            Envelope::Continuity { .. } => "checkpoint",
            Envelope::ContentDelta { .. } => "content",
            Envelope::SearchBegin { .. } => "search_start",
            Envelope::SearchResults { .. } => "search_results",
            Envelope::SearchFailure { .. } => "search_error",
            Envelope::Terminal => "end",
            Envelope::Unrecognized { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Envelope is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("Envelope has no string `type` field")]
    MissingKind,
    #[error("Malformed `{kind}` envelope: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`urls` is neither a list of strings nor an encoded one: {0}")]
    Urls(#[source] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEnvelope {
    Checkpoint { checkpoint_id: String },
    Content { content: String },
    SearchStart { query: String },
    SearchResults { urls: Value },
    SearchError { error: String },
    End,
}

const KNOWN_KINDS: [&str; 6] = [
    "checkpoint",
    "content",
    "search_start",
    "search_results",
    "search_error",
    "end",
];

/// Decode one `data:` payload.
///
/// Unknown `type` values decode to [`Envelope::Unrecognized`]; a known
/// `type` with missing or mistyped fields is an error.
pub fn decode(raw: &str) -> Result<Envelope, EnvelopeError> {
    let value: Value = serde_json::from_str(raw).map_err(EnvelopeError::Json)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingKind)?;

    let Some(known) = KNOWN_KINDS.iter().find(|k| **k == kind).copied() else {
        return Ok(Envelope::Unrecognized {
            kind: kind.to_string(),
            payload: value,
        });
    };

    let wire = WireEnvelope::deserialize(&value).map_err(|source| EnvelopeError::Shape {
        kind: known,
        source,
    })?;

    Ok(match wire {
        WireEnvelope::Checkpoint { checkpoint_id } => Envelope::Continuity { checkpoint_id },
        WireEnvelope::Content { content } => Envelope::ContentDelta { text: content },
        WireEnvelope::SearchStart { query } => Envelope::SearchBegin { query },
        WireEnvelope::SearchResults { urls } => Envelope::SearchResults {
            urls: coerce_urls(&urls)?,
        },
        WireEnvelope::SearchError { error } => Envelope::SearchFailure { error },
        WireEnvelope::End => Envelope::Terminal,
    })
}

/// Normalize the `urls` field to a list of strings.
///
/// The producer sends either a list or a JSON-encoded string of one. A
/// string that does not decode falls back to being read as an
/// already-structured list, which fails for anything but a list.
pub fn coerce_urls(value: &Value) -> Result<Vec<String>, EnvelopeError> {
    if let Value::String(encoded) = value {
        match serde_json::from_str::<Vec<String>>(encoded) {
            Ok(urls) => return Ok(urls),
            Err(e) => {
                tracing::debug!(error = %e, "Encoded urls did not decode, reading as list");
            }
        }
    }
    Vec::<String>::deserialize(value).map_err(EnvelopeError::Urls)
}
