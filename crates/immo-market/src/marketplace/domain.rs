use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for published listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for payment intents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deserializes case-insensitively, matching the publish form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PropertyType {
    Maison,
    Appartement,
    Studio,
    Duplex,
    Villa,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyType::Maison => "Maison",
            PropertyType::Appartement => "Appartement",
            PropertyType::Studio => "Studio",
            PropertyType::Duplex => "Duplex",
            PropertyType::Villa => "Villa",
        }
    }
}

impl FromStr for PropertyType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "maison" => Ok(Self::Maison),
            "appartement" => Ok(Self::Appartement),
            "studio" => Ok(Self::Studio),
            "duplex" => Ok(Self::Duplex),
            "villa" => Ok(Self::Villa),
            _ => Err(()),
        }
    }
}

impl TryFrom<String> for PropertyType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("unknown property type '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum TransactionType {
    Vente,
    Location,
}

impl TransactionType {
    pub const fn label(self) -> &'static str {
        match self {
            TransactionType::Vente => "Vente",
            TransactionType::Location => "Location",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vente" => Ok(Self::Vente),
            "location" => Ok(Self::Location),
            _ => Err(()),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("unknown transaction type '{value}'"))
    }
}

/// Moderation state of a listing. Approved and rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admin decision applied to a pending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub const fn label(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a listing that is {}", .action.label(), .from.label())]
pub struct InvalidTransition {
    pub from: ListingStatus,
    pub action: ModerationAction,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }

    /// Transition table: only pending listings can be moderated.
    pub fn apply(self, action: ModerationAction) -> Result<ListingStatus, InvalidTransition> {
        match (self, action) {
            (ListingStatus::Pending, ModerationAction::Approve) => Ok(ListingStatus::Approved),
            (ListingStatus::Pending, ModerationAction::Reject) => Ok(ListingStatus::Rejected),
            (from, action) => Err(InvalidTransition { from, action }),
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ListingStatus::Pending)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    ListingPublish,
    PhoneUnlock,
}

/// Server-side fee table; amounts are never taken from client input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub publish: u64,
    pub phone_unlock: u64,
    pub currency: String,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            publish: 1500,
            phone_unlock: 2500,
            currency: "CFA".to_string(),
        }
    }
}

impl FeeSchedule {
    pub fn amount_for(&self, kind: PaymentKind) -> u64 {
        match kind {
            PaymentKind::ListingPublish => self.publish,
            PaymentKind::PhoneUnlock => self.phone_unlock,
        }
    }
}

/// Raw publish form as received from the client. Numbers arrive as text so that
/// validation can name the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingSubmission {
    pub city: Option<String>,
    pub commune: Option<String>,
    pub neighborhood: Option<String>,
    pub rooms: Option<String>,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub price: Option<String>,
    pub deposit: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub images: Vec<String>,
}

impl ListingSubmission {
    /// Assigns a text form field by its wire name. Unknown fields are ignored.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "city" => &mut self.city,
            "commune" => &mut self.commune,
            "neighborhood" => &mut self.neighborhood,
            "rooms" => &mut self.rooms,
            "propertyType" => &mut self.property_type,
            "transactionType" => &mut self.transaction_type,
            "price" => &mut self.price,
            "deposit" => &mut self.deposit,
            "description" => &mut self.description,
            "phone" => &mut self.phone,
            "images" => {
                self.images.push(value);
                return true;
            }
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub status: ListingStatus,
    pub payment_status: PaymentStatus,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<u64>,
    pub city: String,
    pub commune: String,
    pub neighborhood: String,
    pub rooms: u32,
    pub phone: String,
    pub description: String,
    pub images: Vec<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_public(&self) -> bool {
        self.status == ListingStatus::Approved
    }

    /// Copy suitable for anonymous visitors: the contact number stays hidden
    /// until a phone-unlock payment is confirmed.
    pub fn redacted(mut self) -> Self {
        self.phone = mask_phone(&self.phone);
        self
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.city, &self.commune, &self.neighborhood]
            .iter()
            .any(|value| value.to_lowercase().contains(&needle))
    }
}

/// Hides every digit but the last two.
pub fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0;
    phone
        .chars()
        .map(|ch| {
            if ch.is_ascii_digit() {
                seen += 1;
                if seen + 2 <= digits {
                    return '*';
                }
            }
            ch
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub kind: PaymentKind,
    pub target_id: ListingId,
    pub amount: u64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(kind: PaymentKind, target_id: ListingId, fees: &FeeSchedule) -> Self {
        Self {
            id: PaymentId::generate(),
            kind,
            target_id,
            amount: fees.amount_for(kind),
            currency: fees.currency.clone(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }
}
