//! Record builders shared by the unit tests.

use tender_core::{normalize, ETenderFields, RawTender, TenderExtension, TenderRecord};

pub fn record(n: usize) -> TenderRecord {
    normalize(&RawTender {
        id: Some(n.to_string()),
        source: Some("eTenders".into()),
        title: Some(format!("Tender {n}")),
        description: Some(format!("Description of tender {n}")),
        published_date: Some("2025-10-01T09:00:00".into()),
        closing_date: Some("2025-10-31T16:00:00".into()),
        extension: TenderExtension::ETenders(ETenderFields {
            tender_number: Some(format!("ET{n:04}")),
            ..Default::default()
        }),
        ..Default::default()
    })
    .expect("fixture record is valid")
}

pub fn records(count: usize) -> Vec<TenderRecord> {
    (0..count).map(record).collect()
}
