//! Encode [`TenderRecord`]s into queue messages.

use tender_core::TenderRecord;

use crate::error::QueueError;
use crate::producer::OutgoingMessage;

/// Batch-local entry id. Unique within one send, which is all SQS requires.
pub fn entry_id(batch_index: usize, position: usize) -> String {
    format!("tender_message_{batch_index}_{position}")
}

/// Encode one record as a message in `group_id`.
pub fn encode_record(
    record: &TenderRecord,
    batch_index: usize,
    position: usize,
    group_id: &str,
) -> Result<OutgoingMessage, QueueError> {
    let body = record.to_json().map_err(|e| {
        QueueError::Serialize(format!(
            "record {:?} ({}): {e}",
            record.title(),
            record.reference().unwrap_or("-")
        ))
    })?;

    Ok(OutgoingMessage {
        id: entry_id(batch_index, position),
        body,
        group_id: group_id.to_string(),
        dedup_id: record.dedup_token(),
    })
}

/// Encode a whole batch. Fails if any record fails; batches are all-or-nothing.
pub fn encode_batch(
    batch_index: usize,
    records: &[TenderRecord],
    group_id: &str,
) -> Result<Vec<OutgoingMessage>, QueueError> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| encode_record(record, batch_index, position, group_id))
        .collect()
}
