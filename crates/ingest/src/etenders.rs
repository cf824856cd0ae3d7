//! Field mapping for the National Treasury eTenders portal.
//!
//! The portal has shipped two spellings of its listing fields (`tenderNo` vs
//! `tender_No`, `supportingDocuments` vs `supportDocument`, ...). Each
//! canonical field probes a list of known keys in order and takes the first
//! non-blank value.

use serde_json::{Map, Value};
use tracing::debug;

use tender_core::{ETenderFields, RawDocument, RawTender, SourceTag, TenderExtension, ValidationError};

use crate::adapter::{kind, SourceAdapter};

const ID_KEYS: &[&str] = &["id", "tenderId", "tender_ID"];
const TITLE_KEYS: &[&str] = &["title", "tenderTitle"];
/// The portal has no separate title; its description doubles as one.
const DESCRIPTION_KEYS: &[&str] = &["description", "tenderDescription"];
const PUBLISHED_KEYS: &[&str] = &["datePublished", "date_Published", "publishedDate"];
const CLOSING_KEYS: &[&str] = &["closingDate", "closing_Date"];
const TENDER_NO_KEYS: &[&str] = &["tenderNo", "tender_No", "tenderNumber"];
const CATEGORY_KEYS: &[&str] = &["categoryName", "category"];
const TYPE_KEYS: &[&str] = &["tenderType", "type"];
const DEPARTMENT_KEYS: &[&str] = &["departmentName", "department", "organ_of_State"];
const PROVINCE_KEYS: &[&str] = &["province"];
const CONTACT_KEYS: &[&str] = &["contactPerson", "contact_Person"];
const EMAIL_KEYS: &[&str] = &["email"];
const TELEPHONE_KEYS: &[&str] = &["telephone", "tel"];
const BRIEFING_KEYS: &[&str] = &["briefingVenue", "briefingSession"];
/// Address parts, joined in this order.
const ADDRESS_KEYS: &[&str] = &["streetname", "surburb", "town", "code"];
const DOCUMENT_LIST_KEYS: &[&str] = &["supportingDocuments", "supportDocument"];
const TAG_KEYS: &[&str] = &["tags"];

const DOC_NAME_KEYS: &[&str] = &["name", "fileName"];
const DOC_URL_KEYS: &[&str] = &["url"];
const DOC_BLOB_KEYS: &[&str] = &["supportDocumentID", "blobName"];
const DOC_EXTENSION_KEYS: &[&str] = &["extension"];

/// Adapter for `PaginatedTenderOpportunities` pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ETendersAdapter;

impl SourceAdapter for ETendersAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::ETenders
    }

    fn adapt_item(&self, item: &Value) -> Result<RawTender, ValidationError> {
        let obj = item
            .as_object()
            .ok_or_else(|| ValidationError::Malformed(format!("item is {}", kind(item))))?;

        let description = probe(obj, DESCRIPTION_KEYS);
        let title = probe(obj, TITLE_KEYS).or_else(|| description.clone());

        Ok(RawTender {
            id: probe(obj, ID_KEYS),
            source: Some(self.source().as_str().to_string()),
            title,
            description,
            published_date: probe(obj, PUBLISHED_KEYS),
            closing_date: probe(obj, CLOSING_KEYS),
            documents: documents(obj),
            tags: tags(obj),
            extension: TenderExtension::ETenders(ETenderFields {
                tender_number: probe(obj, TENDER_NO_KEYS),
                category: probe(obj, CATEGORY_KEYS),
                tender_type: probe(obj, TYPE_KEYS),
                department: probe(obj, DEPARTMENT_KEYS),
                province: probe(obj, PROVINCE_KEYS),
                contact_person: probe(obj, CONTACT_KEYS),
                email: probe(obj, EMAIL_KEYS),
                telephone: probe(obj, TELEPHONE_KEYS),
                address: address(obj),
                briefing_session: probe(obj, BRIEFING_KEYS),
            }),
        })
    }
}

/// Scalar as text. Objects, arrays and null have no text form.
fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First non-blank scalar among `keys`.
fn probe(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(text))
        .find(|s| !s.trim().is_empty())
}

fn address(obj: &Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = ADDRESS_KEYS
        .iter()
        .filter_map(|k| obj.get(*k).and_then(text))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn tags(obj: &Map<String, Value>) -> Vec<String> {
    TAG_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|list| list.iter().filter_map(text).collect())
        .unwrap_or_default()
}

/// Documents in either portal shape. Entries matching neither, and links
/// without a name, are skipped.
fn documents(obj: &Map<String, Value>) -> Vec<RawDocument> {
    let Some(list) = DOCUMENT_LIST_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|entry| {
            let doc = entry.as_object().and_then(document);
            if doc.is_none() {
                debug!(entry = %entry, "Skipping unusable supporting document");
            }
            doc
        })
        .collect()
}

fn document(obj: &Map<String, Value>) -> Option<RawDocument> {
    let name = probe(obj, DOC_NAME_KEYS);
    if let Some(url) = probe(obj, DOC_URL_KEYS) {
        // A link without a name is skipped; the tender itself stays valid.
        return name.map(|name| RawDocument::Link { name, url });
    }
    let blob_id = probe(obj, DOC_BLOB_KEYS)?;
    Some(RawDocument::Blob {
        file_name: name.unwrap_or_else(|| blob_id.clone()),
        extension: probe(obj, DOC_EXTENSION_KEYS).unwrap_or_default(),
        blob_id,
    })
}
