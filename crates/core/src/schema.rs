//! Record Schema: validation and coercion of one raw tender.
//!
//! [`normalize`] is pure. It trims text, parses dates under the single
//! accepted source format, resolves document links, and either returns a
//! [`TenderRecord`] or a [`ValidationError`] describing the first problem.

use chrono::NaiveDateTime;
use url::Url;

use crate::error::ValidationError;
use crate::record::{SourceTag, SupportingDoc, TenderExtension, TenderRecord};

/// Only date-time format accepted from the source (ISO-8601, no offset).
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const BLOB_NAME_PARAM: &str = "blobName";
const FILE_NAME_PARAM: &str = "downloadedFileName";

/// A supporting document as the source describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDocument {
    /// The source gave a ready-made URL.
    Link { name: String, url: String },
    /// The source gave only a storage identifier; the URL is built from the
    /// source's download base.
    Blob {
        blob_id: String,
        extension: String,
        file_name: String,
    },
}

/// Source item after field renaming, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTender {
    /// Source-side identifier, used only for logging.
    pub id: Option<String>,
    pub source: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub closing_date: Option<String>,
    pub documents: Vec<RawDocument>,
    /// Whatever the source calls tags. Never copied into the record.
    pub tags: Vec<String>,
    pub extension: TenderExtension,
}

impl RawTender {
    /// Short label for log lines: source id and reference number.
    pub fn label(&self) -> String {
        format!(
            "id={} ref={}",
            self.id.as_deref().unwrap_or("unknown"),
            self.extension.reference().unwrap_or("-")
        )
    }
}

/// Validate and coerce one raw item into a [`TenderRecord`].
pub fn normalize(raw: &RawTender) -> Result<TenderRecord, ValidationError> {
    let title = required(raw.title.as_deref(), "title")?;
    let description = required(raw.description.as_deref(), "description")?;
    let source: SourceTag = required(raw.source.as_deref(), "source")?.parse()?;

    let published_date = parse_date(raw.published_date.as_deref(), "publishedDate")?;
    let closing_date = parse_date(raw.closing_date.as_deref(), "closingDate")?;
    if let (Some(published), Some(closing)) = (published_date, closing_date) {
        if closing < published {
            return Err(ValidationError::DateOrder { published, closing });
        }
    }

    let supporting_documents = raw
        .documents
        .iter()
        .map(|doc| resolve_document(source, doc))
        .collect::<Result<Vec<_>, _>>()?;

    let extension = raw.extension.trimmed();
    if extension.source() != source {
        return Err(ValidationError::Malformed(format!(
            "{} item carries {} extension fields",
            source,
            extension.source()
        )));
    }

    Ok(TenderRecord {
        title,
        description,
        source,
        published_date,
        closing_date,
        supporting_documents,
        tags: Vec::new(),
        extension,
    })
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}

/// Blank or absent dates mean the source omitted them.
fn parse_date(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<NaiveDateTime>, ValidationError> {
    let Some(s) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDateTime::parse_from_str(s, SOURCE_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: s.to_string(),
        })
}

fn resolve_document(source: SourceTag, doc: &RawDocument) -> Result<SupportingDoc, ValidationError> {
    match doc {
        RawDocument::Link { name, url } => {
            let name = document_name(name)?;
            let url = Url::parse(url.trim()).map_err(|e| ValidationError::InvalidDocumentUrl {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            check_absolute(&name, &url)?;
            Ok(SupportingDoc { name, url })
        }
        RawDocument::Blob {
            blob_id,
            extension,
            file_name,
        } => {
            let name = document_name(file_name)?;
            let blob_id = blob_id.trim();
            if blob_id.is_empty() {
                return Err(ValidationError::InvalidDocumentUrl {
                    name,
                    reason: "empty blob identifier".to_string(),
                });
            }
            let blob_name = format!("{}{}", blob_id, extension.trim());
            let url = document_url(source.document_base(), &blob_name, &name)?;
            Ok(SupportingDoc { name, url })
        }
    }
}

fn document_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidDocumentUrl {
            name: String::new(),
            reason: "empty document name".to_string(),
        });
    }
    Ok(name.to_string())
}

fn check_absolute(name: &str, url: &Url) -> Result<(), ValidationError> {
    let web = matches!(url.scheme(), "http" | "https");
    if !web || url.host_str().is_none() {
        return Err(ValidationError::InvalidDocumentUrl {
            name: name.to_string(),
            reason: format!("not an absolute web URL: {url}"),
        });
    }
    Ok(())
}

/// Build the download URL for a stored blob.
pub fn document_url(base: &str, blob_name: &str, file_name: &str) -> Result<Url, ValidationError> {
    let mut url = Url::parse(base).map_err(|e| ValidationError::InvalidDocumentUrl {
        name: file_name.to_string(),
        reason: format!("bad download base {base:?}: {e}"),
    })?;
    check_absolute(file_name, &url)?;
    url.query_pairs_mut()
        .append_pair(BLOB_NAME_PARAM, blob_name)
        .append_pair(FILE_NAME_PARAM, file_name);
    Ok(url)
}

/// Inverse of [`document_url`]: `(blob_name, file_name)` if both are present.
pub fn parse_document_url(url: &Url) -> Option<(String, String)> {
    let mut blob = None;
    let mut file = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            BLOB_NAME_PARAM => blob = Some(value.into_owned()),
            FILE_NAME_PARAM => file = Some(value.into_owned()),
            _ => {}
        }
    }
    Some((blob?, file?))
}
