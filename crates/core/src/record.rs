//! Canonical tender record shared by every source.
//!
//! A [`TenderRecord`] is a fixed core (title, dates, documents, tags) plus a
//! source-tagged [`TenderExtension`]. Records are only built by
//! [`crate::schema::normalize`] and expose no mutating methods.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::ValidationError;

// ── Source tag ────────────────────────────────────────────────

/// Origin portal of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    /// National Treasury eTenders portal.
    #[serde(rename = "eTenders")]
    ETenders,
}

impl SourceTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceTag::ETenders => "eTenders",
        }
    }

    /// FIFO ordering group shared by every message from this source.
    pub const fn group_id(&self) -> &'static str {
        match self {
            SourceTag::ETenders => "eTenderScrape",
        }
    }

    /// Base path that blob identifiers are resolved against.
    pub const fn document_base(&self) -> &'static str {
        match self {
            SourceTag::ETenders => "https://www.etenders.gov.za/home/Download/",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etenders" => Ok(SourceTag::ETenders),
            _ => Err(ValidationError::UnknownSource(s.to_string())),
        }
    }
}

// ── Documents ─────────────────────────────────────────────────

/// A downloadable file attached to a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportingDoc {
    pub name: String,
    pub url: Url,
}

// ── Extensions ────────────────────────────────────────────────

/// Fields published by the eTenders portal on top of the common core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ETenderFields {
    pub tender_number: Option<String>,
    pub category: Option<String>,
    pub tender_type: Option<String>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    /// Street, suburb, town and postal code joined into one line.
    pub address: Option<String>,
    pub briefing_session: Option<String>,
}

impl ETenderFields {
    /// Copy with every value trimmed and blanks dropped.
    pub fn trimmed(&self) -> Self {
        fn clean(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        Self {
            tender_number: clean(&self.tender_number),
            category: clean(&self.category),
            tender_type: clean(&self.tender_type),
            department: clean(&self.department),
            province: clean(&self.province),
            contact_person: clean(&self.contact_person),
            email: clean(&self.email),
            telephone: clean(&self.telephone),
            address: clean(&self.address),
            briefing_session: clean(&self.briefing_session),
        }
    }
}

/// Source-specific field set, one variant per [`SourceTag`].
///
/// Serialized untagged so the fields sit next to the core fields in the
/// message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TenderExtension {
    ETenders(ETenderFields),
}

impl TenderExtension {
    pub fn source(&self) -> SourceTag {
        match self {
            TenderExtension::ETenders(_) => SourceTag::ETenders,
        }
    }

    /// Canonical reference number assigned by the source, if any.
    pub fn reference(&self) -> Option<&str> {
        match self {
            TenderExtension::ETenders(f) => f.tender_number.as_deref(),
        }
    }

    pub(crate) fn trimmed(&self) -> Self {
        match self {
            TenderExtension::ETenders(f) => TenderExtension::ETenders(f.trimmed()),
        }
    }
}

impl Default for TenderExtension {
    fn default() -> Self {
        TenderExtension::ETenders(ETenderFields::default())
    }
}

// ── Record ────────────────────────────────────────────────────

/// One validated tender, ready for the enrichment queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderRecord {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) source: SourceTag,
    pub(crate) published_date: Option<NaiveDateTime>,
    pub(crate) closing_date: Option<NaiveDateTime>,
    pub(crate) supporting_documents: Vec<SupportingDoc>,
    /// Filled in by the enrichment consumer, never here.
    pub(crate) tags: Vec<String>,
    #[serde(flatten)]
    pub(crate) extension: TenderExtension,
}

impl TenderRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> SourceTag {
        self.source
    }

    pub fn published_date(&self) -> Option<NaiveDateTime> {
        self.published_date
    }

    pub fn closing_date(&self) -> Option<NaiveDateTime> {
        self.closing_date
    }

    pub fn supporting_documents(&self) -> &[SupportingDoc] {
        &self.supporting_documents
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn extension(&self) -> &TenderExtension {
        &self.extension
    }

    pub fn reference(&self) -> Option<&str> {
        self.extension.reference()
    }

    /// Stable deduplication token: SHA-256 hex of source, reference and title.
    ///
    /// Identical logical tenders always produce the same token, so a queue
    /// with content deduplication treats re-sends as duplicates.
    pub fn dedup_token(&self) -> String {
        let joined = format!(
            "{}\n{}\n{}",
            self.source.as_str(),
            self.reference().unwrap_or(""),
            self.title
        );
        let digest = Sha256::digest(joined.as_bytes());
        format!("{digest:x}")
    }

    /// JSON message body delivered to the queue.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
