pub mod draft;
pub mod envelope;
pub mod property;

pub use draft::{sniff_mime, DocumentFile, MediaFile, PropertyDraft};
pub use envelope::{Envelope, PaginationMeta};
pub use property::{
    AgentSummary, DocumentRecord, Location, MediaRecord, PricePeriod, PropertyRecord,
    PropertyType, TransactionType, VerificationStatus, Visibility,
};
