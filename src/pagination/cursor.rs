//! Opaque keyset cursors.
//!
//! Wire format: base64url (no padding) of the UTF-8 JSON
//! `{"createdAt":"<ISO-8601>","id":"<string>"}`. Clients store and replay
//! these verbatim, so the format must not change.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};
use crate::model::{iso_millis, Id};
use crate::store::KeysetPosition;

const CURSOR_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPayload {
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub id: Id,
}

impl From<CursorPayload> for KeysetPosition {
    fn from(payload: CursorPayload) -> Self {
        KeysetPosition {
            created_at: payload.created_at,
            id: payload.id,
        }
    }
}

pub fn encode_cursor(created_at: DateTime<Utc>, id: &str) -> Result<String> {
    let payload = serde_json::to_vec(&CursorPayload {
        created_at,
        id: id.to_string(),
    })?;
    Ok(CURSOR_ENGINE.encode(payload))
}

pub fn decode_cursor(cursor: &str) -> Result<CursorPayload> {
    let bytes = CURSOR_ENGINE
        .decode(cursor.trim())
        .map_err(|e| PersistenceError::MalformedCursor(format!("not base64url: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PersistenceError::MalformedCursor(format!("invalid payload: {}", e)))
}
