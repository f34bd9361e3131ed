//! Entity and span data models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of entity types a span can carry
///
/// Labels coming from the contextual detector are mapped onto this set through
/// [`EntityType::from_label`] before they reach the resolver, so placeholder
/// minting only ever sees these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Person names (first, last, full names)
    Person,
    /// Organization names
    Org,
    /// Addresses, cities, regions, postal codes
    Location,
    /// Email addresses
    Email,
    /// Telephone numbers
    Phone,
    /// Calendar dates, including dates of birth
    Date,
    /// US Social Security Numbers
    Ssn,
    /// Payment card numbers
    CreditCard,
    /// IPv4 addresses
    IpAddress,
    /// Web URLs
    Url,
    /// Passport numbers
    Passport,
    /// Driver's license numbers
    DriversLicense,
    /// Bank account and routing numbers
    BankAccount,
    /// Anything the model tagged with a label outside the allow-list
    Other,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 14] = [
        Self::Person,
        Self::Org,
        Self::Location,
        Self::Email,
        Self::Phone,
        Self::Date,
        Self::Ssn,
        Self::CreditCard,
        Self::IpAddress,
        Self::Url,
        Self::Passport,
        Self::DriversLicense,
        Self::BankAccount,
        Self::Other,
    ];

    /// Placeholder label for the type (the `TYPE` in `[TYPE<N>]`)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Location => "LOCATION",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Date => "DATE",
            Self::Ssn => "SSN",
            Self::CreditCard => "CREDIT_CARD",
            Self::IpAddress => "IP_ADDRESS",
            Self::Url => "URL",
            Self::Passport => "PASSPORT",
            Self::DriversLicense => "DRIVERS_LICENSE",
            Self::BankAccount => "BANK_ACCOUNT",
            Self::Other => "OTHER",
        }
    }

    /// Map a free-form label onto the allow-list
    ///
    /// Returns `None` for labels outside the allow-list; callers decide whether
    /// to bucket those into [`EntityType::Other`] or drop them.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "PERSON" | "NAME" | "PER" | "FULL_NAME" => Some(Self::Person),
            "ORG" | "ORGANIZATION" | "ORGANISATION" | "COMPANY" => Some(Self::Org),
            "LOCATION" | "LOC" | "GPE" | "ADDRESS" | "ZIP" | "ZIP_CODE" => Some(Self::Location),
            "EMAIL" | "EMAIL_ADDRESS" => Some(Self::Email),
            "PHONE" | "PHONE_NUMBER" | "TELEPHONE" => Some(Self::Phone),
            "DATE" | "DOB" | "DATE_OF_BIRTH" => Some(Self::Date),
            "SSN" => Some(Self::Ssn),
            "CC" | "CREDIT_CARD" | "CARD_NUMBER" => Some(Self::CreditCard),
            "IP" | "IP_ADDRESS" => Some(Self::IpAddress),
            "URL" => Some(Self::Url),
            "PASSPORT" => Some(Self::Passport),
            "DRIVERS_LICENSE" | "DRIVER_LICENSE" | "DL" => Some(Self::DriversLicense),
            "BANK_ACCOUNT" | "ROUTING_NUMBER" | "IBAN" => Some(Self::BankAccount),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which detector produced a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// Deterministic pattern rules
    Pattern,
    /// External model-backed detector
    Contextual,
}

impl SpanSource {
    /// Resolution rank; lower wins on overlap
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Pattern => 0,
            Self::Contextual => 1,
        }
    }
}

/// A half-open `[start, end)` byte range of the source text tagged with an entity type
///
/// Offsets always fall on UTF-8 character boundaries. The raw value is kept for
/// placeholder assignment but never serialized, so span lists can be logged or
/// returned without leaking PII.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Entity type
    pub label: EntityType,
    /// Detector that produced the span
    pub source: SpanSource,
    /// Matched text
    #[serde(skip)]
    pub raw_value: String,
}

impl Span {
    /// Create a span over `text[start..end]`
    ///
    /// Returns `None` when the range is empty, out of bounds, or not on
    /// character boundaries.
    pub fn from_text(
        text: &str,
        start: usize,
        end: usize,
        label: EntityType,
        source: SpanSource,
    ) -> Option<Self> {
        let raw = text.get(start..end).filter(|_| start < end)?;
        Some(Self {
            start,
            end,
            label,
            source,
            raw_value: raw.to_string(),
        })
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the span is valid for `text` and still matches its raw value
    pub fn is_valid_for(&self, text: &str) -> bool {
        self.start < self.end
            && text
                .get(self.start..self.end)
                .is_some_and(|slice| slice == self.raw_value)
    }
}
