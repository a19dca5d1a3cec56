//! # CV Model
//!
//! The record a scraper submits. The client only looks at
//! [`Cv::reference_number`]; all other fields, including ones this model does
//! not know about, are serialized back exactly as received.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Identity of a CV on the scraped site, either text or a number.
///
/// Compared by canonical text, so `7` and `"7"` are the same reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceNumber {
    /// Numeric reference.
    Number(i64),
    /// Text reference.
    Text(String),
}

impl ReferenceNumber {
    /// True for the empty string, which is never a valid reference.
    pub fn is_empty(&self) -> bool {
        matches!(self, ReferenceNumber::Text(s) if s.is_empty())
    }

    /// Canonical text used for comparisons.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceNumber::Number(n) => write!(f, "{}", n),
            ReferenceNumber::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for ReferenceNumber {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ReferenceNumber {}

impl From<&str> for ReferenceNumber {
    fn from(value: &str) -> Self {
        ReferenceNumber::Text(value.to_string())
    }
}

impl From<String> for ReferenceNumber {
    fn from(value: String) -> Self {
        ReferenceNumber::Text(value)
    }
}

impl From<i64> for ReferenceNumber {
    fn from(value: i64) -> Self {
        ReferenceNumber::Number(value)
    }
}

impl From<&ReferenceNumber> for ReferenceNumber {
    fn from(value: &ReferenceNumber) -> Self {
        value.clone()
    }
}

/// Language skill level, sent as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LangLevel {
    /// 0
    #[default]
    Unknown = 0,
    /// 1
    Reasonable = 1,
    /// 2
    Good = 2,
    /// 3
    Excellent = 3,
}

impl Serialize for LangLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for LangLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(LangLevel::Unknown),
            1 => Ok(LangLevel::Reasonable),
            2 => Ok(LangLevel::Good),
            3 => Ok(LangLevel::Excellent),
            other => Err(serde::de::Error::custom(format!("invalid language level {}", other))),
        }
    }
}

/// Personal details of the candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PersonalDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sur_name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sur_name: Option<String>,
    /// RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_number_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One education entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Education {
    /// Education kind as numbered by RT-CV (0, 1 or 2).
    #[serde(rename = "is")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub institute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_diploma: Option<bool>,
    /// RFC 3339
    pub start_date: Option<String>,
    /// RFC 3339
    pub end_date: Option<String>,
}

/// One course entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Course {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One work experience entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct WorkExperience {
    pub profession: String,
    pub description: String,
    pub employer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub still_employed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_hours_worked: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// One spoken language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Language {
    pub name: String,
    pub level_spoken: Option<LangLevel>,
    pub level_written: Option<LangLevel>,
}

/// # CV
///
/// A scanned CV ready to be sent to RT-CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cv {
    /// Unique identity on the scraped site, used for deduplication.
    pub reference_number: ReferenceNumber,
    /// Link to the CV on the scraped site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Free text presentation of the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<String>,
    /// Candidate details.
    #[serde(default)]
    pub personal_details: PersonalDetails,
    /// Jobs the candidate is looking for.
    #[serde(default)]
    pub preferred_jobs: Vec<String>,
    /// Employment history.
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    /// Education history.
    #[serde(default)]
    pub educations: Vec<Education>,
    /// Courses followed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<Course>,
    /// Spoken languages.
    #[serde(default)]
    pub languages: Vec<Language>,
    /// Driver's license categories.
    #[serde(default)]
    pub drivers_licenses: Vec<String>,
    /// Fields unknown to this model, forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cv {
    /// An empty CV with only a reference number.
    pub fn new(reference_number: impl Into<ReferenceNumber>) -> Self {
        Self {
            reference_number: reference_number.into(),
            link: None,
            presentation: None,
            personal_details: PersonalDetails::default(),
            preferred_jobs: Vec::new(),
            work_experiences: Vec::new(),
            educations: Vec::new(),
            courses: Vec::new(),
            languages: Vec::new(),
            drivers_licenses: Vec::new(),
            extra: Map::new(),
        }
    }
}
