use super::property::{Location, PricePeriod, PropertyType, TransactionType};
use crate::capture::PreviewHandle;
use chrono::{DateTime, Utc};

/// An image attached to a draft, either captured or picked from disk
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    /// Coarse category sent as `file_type`, e.g. "image"
    pub file_type: String,
    pub mime_type: String,
    pub file_size: u64,
    pub bytes: Vec<u8>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl MediaFile {
    /// Build a media file whose declared size matches its payload
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        let file_type = mime_type
            .split('/')
            .next()
            .unwrap_or("application")
            .to_string();
        Self {
            file_name: file_name.into(),
            file_type,
            mime_type,
            file_size: bytes.len() as u64,
            bytes,
            captured_at: None,
        }
    }
}

/// A supporting document such as a title deed
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    pub file_name: String,
    pub document_type: String,
    pub mime_type: String,
    pub file_size: u64,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(
        file_name: impl Into<String>,
        document_type: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            document_type: document_type.into(),
            mime_type: mime_type.into(),
            file_size: bytes.len() as u64,
            bytes,
        }
    }
}

/// Property as filled in by an agent, before submission.
///
/// Enum fields are optional here because an incomplete form is a normal
/// state; the assembler rejects drafts that are missing them.
#[derive(Debug, Clone, Default)]
pub struct PropertyDraft {
    pub title: String,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub transaction_type: Option<TransactionType>,
    pub price: Option<f64>,
    pub price_period: Option<PricePeriod>,
    pub security_deposit: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area_sqft: Option<f64>,
    pub features: Vec<String>,
    pub location: Location,
    pub media: Vec<MediaFile>,
    pub documents: Vec<DocumentFile>,
    /// Previews of captured photos, held until the form is built or the
    /// draft is abandoned
    pub previews: Vec<PreviewHandle>,
}

/// Detect a mime type from well-known magic bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
        (&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
    ];

    for (magic, mime) in SIGNATURES {
        if bytes.starts_with(magic) {
            return Some(mime);
        }
    }

    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    None
}
