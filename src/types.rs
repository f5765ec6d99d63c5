use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ReadError;

/// Card status information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardStatus {
    pub present: bool,
    pub empty: bool,
    pub mute: bool,
}

/// Gender as stored on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// One person's name as four ordered slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub title: String,
    pub first: String,
    pub middle: String,
    pub last: String,
}

/// Structured address. The card's fifth slot is not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    pub house_no: String,
    pub village_no: String,
    pub lane: String,
    pub road: String,
    pub sub_district: String,
    pub district: String,
    pub province: String,
}

/// Decoded national identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    #[serde(rename = "citizenId")]
    pub citizen_id: String,
    #[serde(rename = "titleTH")]
    pub title_th: String,
    #[serde(rename = "firstNameTH")]
    pub first_name_th: String,
    #[serde(rename = "middlenameTH")]
    pub middle_name_th: String,
    #[serde(rename = "lastNameTH")]
    pub last_name_th: String,
    #[serde(rename = "titleEN")]
    pub title_en: String,
    #[serde(rename = "firstNameEN")]
    pub first_name_en: String,
    #[serde(rename = "middlenameEN")]
    pub middle_name_en: String,
    #[serde(rename = "lastNameEN")]
    pub last_name_en: String,
    pub birthday: String,
    pub gender: Gender,
    #[serde(rename = "rawAddress")]
    pub raw_address: AddressParts,
    pub address: String,
    pub issue: String,
    pub expire: String,
    /// Base64 JPEG payload, without the data URI prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl IdentityRecord {
    /// The photo wrapped as a `data:` URI.
    pub fn photo_data_uri(&self) -> Option<String> {
        self.photo
            .as_ref()
            .map(|payload| format!("data:image/jpeg;base64,{}", payload))
    }
}

/// Labels for the read steps that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStep {
    CitizenId,
    PersonalInfo,
    Address,
    IssueExpire,
    Photo,
}

impl fmt::Display for ReadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStep::CitizenId => write!(f, "citizen_id"),
            ReadStep::PersonalInfo => write!(f, "personal_info"),
            ReadStep::Address => write!(f, "address"),
            ReadStep::IssueExpire => write!(f, "issue_expire"),
            ReadStep::Photo => write!(f, "photo"),
        }
    }
}

/// Payload of a `READING` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingProgress {
    pub step: usize,
    pub of: usize,
    pub message: ReadStep,
}

/// Events emitted by a read session.
///
/// Serializes as `{"status": ..., "obj": ...}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "obj", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressEvent {
    Start,
    Reading(ReadingProgress),
    Complete(Box<IdentityRecord>),
    Error(#[serde(serialize_with = "serialize_error")] ReadError),
}

impl ProgressEvent {
    /// True for `COMPLETE` and `ERROR`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete(_) | ProgressEvent::Error(_))
    }
}

fn serialize_error<S: Serializer>(error: &ReadError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
