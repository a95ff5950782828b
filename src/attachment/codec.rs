//! Normalization and decoding of stored attachment payloads.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

use crate::attachment::AttachmentColumns;
use crate::database::value::{FieldMap, FieldValue};

/// Replaces the payload column in list responses: clients learn an
/// attachment exists and fetch the bytes through the serving endpoints.
pub const ATTACHMENT_SENTINEL: &str = "exists";

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Unknown file encoding")]
    UnsupportedEncoding,

    #[error("Attachment payload is empty")]
    EmptyPayload,

    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Replace a present payload with the `"exists"` sentinel when its
/// filename is known. Payloads without filename metadata (rows from
/// before filenames were recorded) are re-encoded as base64 text so the
/// row stays JSON-serializable; everything else is left untouched.
pub fn normalize_attachment(mut row: FieldMap, cols: &AttachmentColumns) -> FieldMap {
    let payload_present = match row.get(cols.payload) {
        Some(FieldValue::Bytes(_)) => true,
        Some(FieldValue::Text(s)) => !s.is_empty(),
        _ => false,
    };
    let filename_known = matches!(row.get(cols.filename), Some(FieldValue::Text(name)) if !name.is_empty());

    if payload_present && filename_known {
        row.set(cols.payload, FieldValue::Text(ATTACHMENT_SENTINEL.to_string()));
    } else if payload_present {
        let encoded = match row.get(cols.payload) {
            Some(FieldValue::Bytes(bytes)) => Some(BASE64.encode(bytes)),
            _ => None,
        };
        if let Some(encoded) = encoded {
            row.set(cols.payload, FieldValue::Text(encoded));
        }
    }

    row
}

/// [`normalize_attachment`] over a whole result set.
pub fn normalize_attachments(rows: Vec<FieldMap>, cols: &AttachmentColumns) -> Vec<FieldMap> {
    rows.into_iter().map(|row| normalize_attachment(row, cols)).collect()
}

/// Recover the raw bytes of a stored payload, whatever shape it was
/// written in. Detection order matters and is fixed:
///
/// 1. bytea comes back as bytes and is used as-is;
/// 2. text starting with `\x` is treated as Postgres text-mode bytea
///    output and hex-decoded (that prefix is driver output, not a
///    general hex convention);
/// 3. text made up entirely of base64 characters is base64-decoded;
/// 4. anything else is an unsupported encoding.
///
/// A payload that decodes to zero bytes is reported as empty rather than
/// served as a zero-length file.
pub fn decode_attachment(value: &FieldValue) -> Result<Vec<u8>, AttachmentError> {
    let bytes = match value {
        FieldValue::Bytes(bytes) => bytes.clone(),
        FieldValue::Text(text) => {
            if let Some(hex_digits) = text.strip_prefix("\\x") {
                hex::decode(hex_digits)?
            } else if is_base64_charset(text) {
                BASE64.decode(text.as_bytes())?
            } else {
                return Err(AttachmentError::UnsupportedEncoding);
            }
        }
        _ => return Err(AttachmentError::UnsupportedEncoding),
    };

    if bytes.is_empty() {
        return Err(AttachmentError::EmptyPayload);
    }
    Ok(bytes)
}

fn is_base64_charset(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}
