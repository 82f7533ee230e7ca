//! Canonical fact records and their sparse wire form.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::extractor::ExtractedPage;

pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Trust level assigned to scraped pages, below manually entered facts.
pub const WEB_CONFIDENCE: f64 = 0.8;

/// Keys that are dropped from the payload when empty.
const OPTIONAL_FIELDS: [&str; 4] = ["url", "title", "tags", "related_entities"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("fact text is empty")]
    EmptyFact,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("confidence {0:?} is not a number")]
    Confidence(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceType {
    #[default]
    Manual,
    Web,
    Other(String),
}

impl SourceType {
    /// Trimmed; blank falls back to `manual`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("manual") {
            Self::Manual
        } else if raw.eq_ignore_ascii_case("web") {
            Self::Web
        } else {
            Self::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Web => "web",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw, unvalidated field text as typed by an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFactInput {
    pub url: String,
    pub title: String,
    pub fact: String,
    pub tags: String,
    pub source_type: String,
    pub confidence: String,
    pub related_entities: String,
}

/// Tags and related entities shared by every record of a scrape batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchMetadata {
    pub tags: Vec<String>,
    pub related_entities: Vec<String>,
}

impl BatchMetadata {
    pub fn from_raw(tags: &str, related_entities: &str) -> Self {
        Self {
            tags: split_list(tags),
            related_entities: split_list(related_entities),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
    pub id: Uuid,
    pub url: Option<String>,
    pub title: Option<String>,
    pub fact: String,
    pub tags: Vec<String>,
    pub source_type: SourceType,
    pub confidence: f64,
    pub related_entities: Vec<String>,
}

impl FactRecord {
    /// Build a record from operator input. Only an empty fact is refused;
    /// every other field degrades to its default.
    pub fn build(raw: &RawFactInput) -> Result<Self, RecordError> {
        let fact = raw.fact.trim();
        if fact.is_empty() {
            return Err(RecordError::EmptyFact);
        }

        let confidence = parse_confidence(&raw.confidence).unwrap_or_else(|e| {
            debug!(error = %e, "Using default confidence {}", DEFAULT_CONFIDENCE);
            DEFAULT_CONFIDENCE
        });

        Ok(Self {
            id: Uuid::new_v4(),
            url: non_blank(&raw.url),
            title: non_blank(&raw.title),
            fact: fact.to_string(),
            tags: split_list(&raw.tags),
            source_type: SourceType::parse(&raw.source_type),
            confidence,
            related_entities: split_list(&raw.related_entities),
        })
    }

    /// Build a record for a scraped page.
    pub fn from_page(page: &ExtractedPage, metadata: &BatchMetadata) -> Result<Self, RecordError> {
        if page.text.trim().is_empty() {
            return Err(RecordError::EmptyFact);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            url: non_blank(&page.url),
            title: non_blank(&page.title),
            fact: page.text.clone(),
            tags: metadata.tags.clone(),
            source_type: SourceType::Web,
            confidence: WEB_CONFIDENCE,
            related_entities: metadata.related_entities.clone(),
        })
    }

    /// The JSON document sent to the ingestion endpoint.
    pub fn to_payload(&self) -> Value {
        // Serializing plain strings, vectors and a finite f64 cannot fail.
        let full = serde_json::to_value(self).unwrap_or(Value::Null);
        drop_empty_optional_fields(full)
    }
}

/// Remove optional keys whose value is null, an empty string or an empty
/// array. Required keys are left alone even when empty.
pub fn drop_empty_optional_fields(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, value)| !(OPTIONAL_FIELDS.contains(&key.as_str()) && is_empty(value)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Split comma separated text, trimming every element and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a confidence value. Out of range numbers are accepted as-is;
/// non-finite values are rejected since JSON cannot carry them.
pub fn parse_confidence(raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::Confidence(raw.to_string()))
}

fn non_blank(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}
