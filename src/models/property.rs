use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of real-estate asset being listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Condo,
    Villa,
    Land,
    Commercial,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Condo => "condo",
            PropertyType::Villa => "villa",
            PropertyType::Land => "land",
            PropertyType::Commercial => "commercial",
            PropertyType::Other => "other",
        }
    }
}

/// How the property is offered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Rent,
    Lease,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Rent => "rent",
            TransactionType::Lease => "lease",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    Day,
    Week,
    Month,
    Year,
}

impl PricePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePeriod::Day => "day",
            PricePeriod::Week => "week",
            PricePeriod::Month => "month",
            PricePeriod::Year => "year",
        }
    }
}

/// Trust label assigned by an administrator.
///
/// Any status may be assigned from any other; there is no forward-only
/// ordering between the three values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Red,
    Yellow,
    Green,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Red => "RED",
            VerificationStatus::Yellow => "YELLOW",
            VerificationStatus::Green => "GREEN",
        }
    }

    /// Whether this status is the outcome of a completed review
    pub fn is_decided(&self) -> bool {
        matches!(self, VerificationStatus::Green | VerificationStatus::Red)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public exposure of a listing, independent of its verification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location information for a property.
///
/// Read models may carry descriptive fields only; a submission requires
/// both coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub gps_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Location {
    /// Both coordinates present and finite
    pub fn has_coordinates(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite()
        )
    }
}

/// Media as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    pub id: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Supporting document as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Agent details embedded in admin views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AgentSummary {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Core property record, as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyRecord {
    pub id: String,
    pub agent_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_period: Option<PricePeriod>,
    #[serde(default)]
    pub security_deposit: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    pub verification_status: VerificationStatus,
    pub visibility: Visibility,
    #[serde(default)]
    pub admin_feedback: Option<String>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub media: Vec<MediaRecord>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub agent: Option<AgentSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyRecord {
    /// City of the first location that names one
    pub fn city(&self) -> Option<&str> {
        self.locations.iter().find_map(|l| l.city.as_deref())
    }

    /// Whether the record was touched after creation
    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }
}
