use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    BadBase64,
    #[error("cursor does not decode to valid JSON")]
    BadJson,
}

/// Encode any keyset-position payload as base64(JSON), exactly the shape
/// spec §3/§4.4 mandates. The Gateway never calls this — it only ever
/// passes cursors through verbatim between client and Tool Server.
pub fn encode_cursor<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).expect("cursor payloads are always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor previously produced by [`encode_cursor`]. An invalid or
/// stale cursor surfaces as `INVALID_CURSOR` at the call site (spec §4.4).
pub fn decode_cursor<T: DeserializeOwned>(cursor: &str) -> Result<T, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::BadBase64)?;
    serde_json::from_slice(&bytes).map_err(|_| CursorError::BadJson)
}

/// Relational (HR, Finance) cursor shape: a multi-column keyset with a
/// unique tie-breaker, e.g. `(last_name, first_name, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct RelationalCursor {
    pub primary: String,
    pub secondary: String,
    /// Unique tie-breaker — prevents duplicate rows across pages when
    /// `primary`/`secondary` repeat (spec §4.4).
    pub id: String,
}

/// Document-store (Sales) cursor shape: a single descending object id.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct DocumentCursor {
    pub last_id: String,
}

/// Search-index (Support) cursor shape: the sort-value tuple the index
/// returned for the last hit, i.e. a "search after" token.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct SearchCursor {
    pub sort_values: Vec<serde_json::Value>,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relational_cursor_round_trips() {
        let c = RelationalCursor {
            primary: "Doe".into(),
            secondary: "Jane".into(),
            id: "e-42".into(),
        };
        let encoded = encode_cursor(&c);
        let decoded: RelationalCursor = decode_cursor(&encoded).unwrap();
        assert_eq!(c, decoded);
    }

    #[test]
    fn document_cursor_round_trips() {
        let c = DocumentCursor {
            last_id: "deal-99".into(),
        };
        let encoded = encode_cursor(&c);
        let decoded: DocumentCursor = decode_cursor(&encoded).unwrap();
        assert_eq!(c, decoded);
    }

    #[test]
    fn garbage_base64_is_invalid_cursor() {
        let result: Result<RelationalCursor, _> = decode_cursor("not-valid-base64!!");
        assert_eq!(result.unwrap_err(), CursorError::BadBase64);
    }

    #[test]
    fn wrong_shape_is_invalid_cursor() {
        let encoded = encode_cursor(&DocumentCursor {
            last_id: "x".into(),
        });
        let result: Result<SearchCursor, _> = decode_cursor(&encoded);
        assert!(result.is_err());
    }
}
