//! Header values for serving a decoded attachment over HTTP.
//!
//! The crate stops at computing the values; the host application owns
//! the response object and sets them.

pub const DEFAULT_FILENAME: &str = "attachment";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// How the client asked for the file: rendered in the browser, or saved
/// to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    Inline,
    Download,
}

/// A decoded attachment ready to serve, with metadata defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRecord {
    payload: Vec<u8>,
    filename: String,
    mime_type: String,
}

impl AttachmentRecord {
    /// Missing or blank metadata falls back to `"attachment"` /
    /// `"application/octet-stream"`.
    pub fn new(payload: Vec<u8>, filename: Option<String>, mime_type: Option<String>) -> Self {
        Self {
            payload,
            filename: filename
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            mime_type: mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> &str {
        &self.mime_type
    }

    /// Value for the `Content-Length` header.
    pub fn content_length(&self) -> usize {
        self.payload.len()
    }

    /// Value for the `Content-Disposition` header. Download filenames are
    /// percent-encoded so unicode and quotes survive the header; inline
    /// filenames are passed through raw for browser display.
    pub fn content_disposition(&self, mode: ServeMode) -> String {
        match mode {
            ServeMode::Inline => format!("inline; filename=\"{}\"", self.filename),
            ServeMode::Download => {
                format!("attachment; filename=\"{}\"", urlencoding::encode(&self.filename))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_defaults_for_missing_metadata() {
        let record = AttachmentRecord::new(vec![1, 2], None, None);
        assert_eq!(record.filename(), "attachment");
        assert_eq!(record.content_type(), "application/octet-stream");
    }

    #[test]
    fn blank_metadata_counts_as_missing() {
        let record = AttachmentRecord::new(vec![1], Some(String::new()), Some(String::new()));
        assert_eq!(record.filename(), "attachment");
        assert_eq!(record.content_type(), "application/octet-stream");
    }

    #[test]
    fn content_length_is_payload_size() {
        let record = AttachmentRecord::new(vec![0; 1536], None, None);
        assert_eq!(record.content_length(), 1536);
    }

    #[test]
    fn inline_disposition_keeps_the_raw_filename() {
        let record = AttachmentRecord::new(
            vec![1],
            Some("annual report 2024.pdf".to_string()),
            Some("application/pdf".to_string()),
        );
        assert_eq!(
            record.content_disposition(ServeMode::Inline),
            "inline; filename=\"annual report 2024.pdf\""
        );
    }

    #[test]
    fn download_disposition_percent_encodes() {
        let record = AttachmentRecord::new(vec![1], Some("تقرير 2024.pdf".to_string()), None);
        assert_eq!(
            record.content_disposition(ServeMode::Download),
            "attachment; filename=\"%D8%AA%D9%82%D8%B1%D9%8A%D8%B1%202024.pdf\""
        );
    }

    #[test]
    fn download_disposition_encodes_quotes() {
        let record = AttachmentRecord::new(vec![1], Some("we \"said\" so.txt".to_string()), None);
        assert_eq!(
            record.content_disposition(ServeMode::Download),
            "attachment; filename=\"we%20%22said%22%20so.txt\""
        );
    }
}
