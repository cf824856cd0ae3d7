//! Order-preserving partitioning of records into queue-sized batches.

/// Split `items` into contiguous chunks of at most `max_size`.
///
/// Order is preserved and every chunk except possibly the last is full.
/// Empty input produces no batches. A `max_size` of 0 is treated as 1.
pub fn partition<T>(items: Vec<T>, max_size: usize) -> Vec<Vec<T>> {
    let max_size = max_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(max_size));
    let mut current = Vec::with_capacity(max_size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == max_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(max_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
