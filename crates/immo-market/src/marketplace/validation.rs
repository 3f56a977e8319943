//! Publish-form validation. The guard turns a raw [`ListingSubmission`] into a
//! [`ListingDraft`] or reports the first field that is missing or malformed.

use super::domain::{ListingSubmission, PropertyType, TransactionType};

/// Validation failure naming the offending form field by its wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    fn missing(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Business attributes that passed validation, images excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAttributes {
    pub city: String,
    pub commune: String,
    pub neighborhood: String,
    pub rooms: u32,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub price: u64,
    pub deposit: Option<u64>,
    pub description: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDraft {
    pub attributes: ListingAttributes,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingGuard;

impl ListingGuard {
    /// Checks every field except `images`. Used before uploads are persisted so
    /// a bad form does not leave orphaned files behind.
    pub fn attributes(
        &self,
        submission: &ListingSubmission,
    ) -> Result<ListingAttributes, ValidationError> {
        let city = required_text("city", &submission.city)?;
        let commune = required_text("commune", &submission.commune)?;
        let neighborhood = required_text("neighborhood", &submission.neighborhood)?;
        let rooms = positive_number("rooms", &submission.rooms)?;
        let rooms = u32::try_from(rooms)
            .map_err(|_| ValidationError::new("rooms", "is out of range"))?;

        let property_type = required_text("propertyType", &submission.property_type)?
            .parse::<PropertyType>()
            .map_err(|_| ValidationError::new("propertyType", "is not a known property type"))?;
        let transaction_type = required_text("transactionType", &submission.transaction_type)?
            .parse::<TransactionType>()
            .map_err(|_| {
                ValidationError::new("transactionType", "must be either Vente or Location")
            })?;

        let price = positive_number("price", &submission.price)?;
        let deposit = optional_number("deposit", &submission.deposit)?;
        let description = required_text("description", &submission.description)?;
        let phone = required_text("phone", &submission.phone)?;
        if !phone.chars().all(is_phone_char) || !phone.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(ValidationError::new(
                "phone",
                "may only contain digits, spaces, and + - ( ) .",
            ));
        }

        Ok(ListingAttributes {
            city,
            commune,
            neighborhood,
            rooms,
            property_type,
            transaction_type,
            price,
            deposit,
            description,
            phone,
        })
    }

    pub fn validate(&self, submission: &ListingSubmission) -> Result<ListingDraft, ValidationError> {
        let attributes = self.attributes(submission)?;

        let images: Vec<String> = submission
            .images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();
        if images.is_empty() {
            return Err(ValidationError::new("images", "at least one image is required"));
        }

        Ok(ListingDraft { attributes, images })
    }
}

fn required_text(field: &'static str, value: &Option<String>) -> Result<String, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::missing(field)),
    }
}

fn positive_number(field: &'static str, value: &Option<String>) -> Result<u64, ValidationError> {
    let raw = required_text(field, value)?;
    match parse_amount(&raw) {
        Some(0) => Err(ValidationError::new(field, "must be greater than zero")),
        Some(number) => Ok(number),
        None => Err(ValidationError::new(field, "must be a whole number")),
    }
}

fn optional_number(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<u64>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_amount(raw)
            .map(Some)
            .ok_or_else(|| ValidationError::new(field, "must be a whole number")),
    }
}

// Accepts grouped thousands ("50 000 000") as typed in the publish form.
fn parse_amount(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    compact.parse::<u64>().ok()
}

fn is_phone_char(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, ' ' | '+' | '-' | '(' | ')' | '.')
}
