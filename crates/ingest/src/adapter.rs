//! Source Adapter: page envelope in, raw tenders out.
//!
//! An adapter is a pure per-page transform. It never fetches, retries, or
//! advances pagination; it only unwraps the envelope and renames fields so
//! the Record Schema sees one shape regardless of source.

use serde_json::Value;

use tender_core::{RawTender, SourceTag, ValidationError};

use crate::error::FetchError;

/// Key the source wraps its result list under.
pub const ENVELOPE_KEY: &str = "data";

const RECORDS_TOTAL_KEY: &str = "recordsTotal";
const RECORDS_FILTERED_KEY: &str = "recordsFiltered";

/// One page after envelope extraction and field mapping.
#[derive(Debug, Default)]
pub struct AdaptedPage {
    /// Per-item mapping result, in source order.
    pub items: Vec<Result<RawTender, ValidationError>>,
    pub records_total: Option<u64>,
    pub records_filtered: Option<u64>,
}

impl AdaptedPage {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Authoritative result count reported by the API, if any.
    pub fn result_count(&self) -> Option<u64> {
        self.records_filtered.or(self.records_total)
    }
}

/// Maps one source's page JSON into [`RawTender`]s.
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceTag;

    /// Map a single item from the envelope list.
    fn adapt_item(&self, item: &Value) -> Result<RawTender, ValidationError>;

    /// Ordering group for everything this source sends.
    fn group_id(&self) -> &'static str {
        self.source().group_id()
    }

    /// Unwrap the envelope and map every item.
    ///
    /// A missing, null, or empty list is an empty page (end of data). Only a
    /// page that is not an object, or whose list is not an array, is an error.
    fn adapt_page(&self, page: &Value) -> Result<AdaptedPage, FetchError> {
        let obj = page
            .as_object()
            .ok_or_else(|| FetchError::MalformedEnvelope(format!("page is {}", kind(page))))?;

        let items = match obj.get(ENVELOPE_KEY) {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                return Err(FetchError::MalformedEnvelope(format!(
                    "`{ENVELOPE_KEY}` is {}",
                    kind(other)
                )))
            }
        };

        Ok(AdaptedPage {
            items: items.iter().map(|item| self.adapt_item(item)).collect(),
            records_total: count(obj.get(RECORDS_TOTAL_KEY)),
            records_filtered: count(obj.get(RECORDS_FILTERED_KEY)),
        })
    }
}

fn count(v: Option<&Value>) -> Option<u64> {
    match v? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
