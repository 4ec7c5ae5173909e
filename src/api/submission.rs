use crate::api::ApiClient;
use crate::capture::{CapturedEvidence, PositionFix, PreviewHandle};
use crate::error::{ClientError, ValidationError};
use crate::models::{
    sniff_mime, DocumentFile, Location, MediaFile, PropertyDraft, PropertyRecord, PropertyType,
    TransactionType,
};
use reqwest::multipart::{Form, Part};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use tracing::{debug, info};
use validator::Validate;

impl PropertyDraft {
    /// Take the coordinates and fix time from a GPS capture, keeping any
    /// address details already entered
    pub fn attach_location(&mut self, fix: &PositionFix) {
        self.location.latitude = Some(fix.latitude);
        self.location.longitude = Some(fix.longitude);
        self.location.gps_timestamp = Some(fix.timestamp);
        self.location.accuracy = Some(fix.accuracy);
    }

    /// Add a captured photo. Its preview stays available until the form is
    /// built or the draft is discarded.
    pub fn attach_photo(&mut self, evidence: CapturedEvidence) {
        let (file, preview) = evidence.into_parts();
        self.media.push(file);
        self.previews.push(preview);
    }

    /// Abandon the draft, releasing any photo previews it holds
    pub fn discard(self) {
        release_previews(self.previews);
    }
}

fn release_previews(previews: Vec<PreviewHandle>) {
    if !previews.is_empty() {
        debug!("Releasing {} photo preview(s)", previews.len());
    }
    for preview in previews {
        preview.release();
    }
}

/// Per-field rules over a borrowed draft
#[derive(Debug, Validate)]
struct DraftFields<'a> {
    #[validate(custom = "not_blank")]
    title: &'a str,
    #[validate(required(message = "Property type is required"))]
    property_type: Option<PropertyType>,
    #[validate(required(message = "Transaction type is required"))]
    transaction_type: Option<TransactionType>,
    #[validate(custom = "latitude_in_range")]
    latitude: Option<f64>,
    #[validate(custom = "longitude_in_range")]
    longitude: Option<f64>,
    #[validate(length(min = 1, message = "At least one image is required"))]
    images: Vec<&'a str>,
    #[validate(length(min = 1, message = "At least one document is required"))]
    documents: Vec<&'a str>,
}

impl<'a> From<&'a PropertyDraft> for DraftFields<'a> {
    fn from(draft: &'a PropertyDraft) -> Self {
        Self {
            title: &draft.title,
            property_type: draft.property_type,
            transaction_type: draft.transaction_type,
            latitude: draft.location.latitude,
            longitude: draft.location.longitude,
            images: draft.media.iter().map(|m| m.file_name.as_str()).collect(),
            documents: draft.documents.iter().map(|d| d.file_name.as_str()).collect(),
        }
    }
}

fn rule_error(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(rule_error("blank", "Title is required"));
    }
    Ok(())
}

fn latitude_in_range<T: Borrow<f64>>(value: T) -> Result<(), validator::ValidationError> {
    let lat = *value.borrow();
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(rule_error(
            "range",
            "Latitude must be a number between -90 and 90",
        ));
    }
    Ok(())
}

fn longitude_in_range<T: Borrow<f64>>(value: T) -> Result<(), validator::ValidationError> {
    let lng = *value.borrow();
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(rule_error(
            "range",
            "Longitude must be a number between -180 and 180",
        ));
    }
    Ok(())
}

/// Latitude and longitude travel together
fn check_coordinate_pair(location: &Location) -> Result<(), ValidationError> {
    match (location.latitude, location.longitude) {
        (None, None) => Err(ValidationError::new(
            "location",
            "Latitude and longitude are required",
        )),
        (Some(_), None) => Err(ValidationError::new(
            "longitude",
            "Longitude is required when latitude is set",
        )),
        (None, Some(_)) => Err(ValidationError::new(
            "latitude",
            "Latitude is required when longitude is set",
        )),
        (Some(_), Some(_)) => Ok(()),
    }
}

/// Check a draft before anything is sent. The first violation wins.
pub fn validate_draft(draft: &PropertyDraft) -> Result<(), ValidationError> {
    let outcome = DraftFields::from(draft).validate();
    let field_errors = outcome
        .as_ref()
        .err()
        .map(|errors| errors.field_errors())
        .unwrap_or_default();
    let first = |field: &'static str| first_violation(&field_errors, field);

    first("title")?;
    first("property_type")?;
    first("transaction_type")?;
    check_coordinate_pair(&draft.location)?;
    first("latitude")?;
    first("longitude")?;
    first("images")?;
    first("documents")?;

    for media in &draft.media {
        check_payload("images", &media.file_name, &media.mime_type, media.file_size, &media.bytes)?;
    }
    for document in &draft.documents {
        check_payload(
            "documents",
            &document.file_name,
            &document.mime_type,
            document.file_size,
            &document.bytes,
        )?;
    }

    Ok(())
}

fn first_violation(
    field_errors: &HashMap<&'static str, &Vec<validator::ValidationError>>,
    field: &'static str,
) -> Result<(), ValidationError> {
    match field_errors.get(field).and_then(|errors| errors.first()) {
        Some(error) => Err(ValidationError::new(
            field,
            error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", field)),
        )),
        None => Ok(()),
    }
}

/// Declared size and mime type must agree with the bytes
fn check_payload(
    field: &'static str,
    file_name: &str,
    mime_type: &str,
    declared_size: u64,
    bytes: &[u8],
) -> Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::new(field, format!("{} is empty", file_name)));
    }
    if declared_size != bytes.len() as u64 {
        return Err(ValidationError::new(
            field,
            format!(
                "{} declares {} bytes but contains {}",
                file_name,
                declared_size,
                bytes.len()
            ),
        ));
    }
    if let Some(detected) = sniff_mime(bytes) {
        if !detected.eq_ignore_ascii_case(mime_type) {
            return Err(ValidationError::new(
                field,
                format!("{} is declared as {} but contains {}", file_name, mime_type, detected),
            ));
        }
    }
    Ok(())
}

/// Serialize a validated draft into one multipart form.
///
/// Scalars become text parts; every image is a repeated `images` part and
/// every document a repeated `documents` part.
pub fn build_form(draft: PropertyDraft) -> Result<Form, ClientError> {
    let PropertyDraft {
        title,
        description,
        property_type,
        transaction_type,
        price,
        price_period,
        security_deposit,
        bedrooms,
        bathrooms,
        area_sqft,
        features,
        location,
        media,
        documents,
        previews,
    } = draft;

    let mut form = Form::new().text("title", title.trim().to_string());

    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        form = form.text("description", description);
    }
    if let Some(property_type) = property_type {
        form = form.text("property_type", property_type.as_str());
    }
    if let Some(transaction_type) = transaction_type {
        form = form.text("transaction_type", transaction_type.as_str());
    }
    if let Some(price) = price {
        form = form.text("price", price.to_string());
    }
    if let Some(period) = price_period {
        form = form.text("price_period", period.as_str());
    }
    if let Some(deposit) = security_deposit {
        form = form.text("security_deposit", deposit.to_string());
    }
    if let Some(bedrooms) = bedrooms {
        form = form.text("bedrooms", bedrooms.to_string());
    }
    if let Some(bathrooms) = bathrooms {
        form = form.text("bathrooms", bathrooms.to_string());
    }
    if let Some(area) = area_sqft {
        form = form.text("area_sqft", area.to_string());
    }
    for feature in features {
        form = form.text("features", feature);
    }

    if let Some(lat) = location.latitude {
        form = form.text("latitude", lat.to_string());
    }
    if let Some(lng) = location.longitude {
        form = form.text("longitude", lng.to_string());
    }
    if let Some(ts) = location.gps_timestamp {
        form = form.text("gps_timestamp", ts.to_rfc3339());
    }
    let descriptive = [
        ("address", location.address),
        ("city", location.city),
        ("state", location.state),
        ("country", location.country),
        ("postal_code", location.postal_code),
    ];
    for (name, value) in descriptive {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            form = form.text(name, value);
        }
    }

    for file in media {
        form = form.part("images", media_part(file)?);
    }
    for file in documents {
        let document_type = file.document_type.clone();
        form = form
            .part("documents", document_part(file)?)
            .text("document_types", document_type);
    }

    release_previews(previews);
    Ok(form)
}

fn media_part(file: MediaFile) -> Result<Part, ClientError> {
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime_type)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid image mime type: {}", e)))
}

fn document_part(file: DocumentFile) -> Result<Part, ClientError> {
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime_type)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid document mime type: {}", e)))
}

impl ApiClient {
    /// Validate and send a new listing. Sent once; a failed submission is
    /// retried by the user resubmitting.
    pub async fn submit_property(&self, draft: PropertyDraft) -> Result<PropertyRecord, ClientError> {
        validate_draft(&draft)?;

        let title = draft.title.trim().to_string();
        let (images, documents) = (draft.media.len(), draft.documents.len());
        let form = build_form(draft)?;

        info!(
            "Submitting \"{}\" with {} image(s) and {} document(s)",
            title, images, documents
        );

        let url = self.url("properties")?;
        let request = self.http().post(url).multipart(form);
        let (record, _): (PropertyRecord, _) = self.execute("POST /properties", request).await?;

        info!(
            "✅ Property {} created ({} / {})",
            record.id, record.verification_status, record.visibility
        );
        Ok(record)
    }
}
