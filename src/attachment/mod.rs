//! Attachment storage and serving support.
//!
//! Binary attachments live inline in entity tables as a column family:
//! a payload column plus `*_filename`, `*_mime` and `*_size` siblings.
//! Historic data is messy; payloads may come back as raw bytea, as
//! Postgres text-mode `\x` hex, or as base64 text written by earlier
//! versions of the platform. The codec normalizes list output and turns
//! any stored shape back into bytes for serving.

pub mod codec;
pub mod serve;

pub use codec::{
    decode_attachment, normalize_attachment, normalize_attachments, AttachmentError,
    ATTACHMENT_SENTINEL,
};
pub use serve::{AttachmentRecord, ServeMode, DEFAULT_FILENAME, DEFAULT_MIME_TYPE};

/// Column names of one attachment family, written as literals in entity
/// configuration. Names are never derived at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentColumns {
    pub payload: &'static str,
    pub filename: &'static str,
    pub mime: &'static str,
    pub size: &'static str,
}

impl AttachmentColumns {
    pub const fn new(
        payload: &'static str,
        filename: &'static str,
        mime: &'static str,
        size: &'static str,
    ) -> Self {
        Self { payload, filename, mime, size }
    }

    /// The `attachments` family used by audits, meetings and most other
    /// record tables.
    pub const ATTACHMENTS: Self = Self::new(
        "attachments",
        "attachments_filename",
        "attachments_mime",
        "attachments_size",
    );

    /// The `file` family used by document-centric tables.
    pub const FILE: Self = Self::new("file", "file_filename", "file_mime", "file_size");

    /// The `media` family used by photo and scan tables.
    pub const MEDIA: Self = Self::new("media", "media_filename", "media_mime", "media_size");
}
