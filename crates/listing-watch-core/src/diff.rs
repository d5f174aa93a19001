//! Identity diff between freshly extracted candidates and the stored set.
//!
//! [`new_records`] is the pure set-difference; [`diff_and_persist`] wraps
//! it with one bulk read of stored ids and one batch write of the survivors.

use std::collections::HashSet;

use anyhow::Result;

use crate::models::Record;
use crate::store::RecordStore;

/// Candidates whose identity key is not in `known`, in their original order.
///
/// A key repeated within `candidates` survives only at its first position.
pub fn new_records(candidates: Vec<Record>, known: &HashSet<String>) -> Vec<Record> {
    let mut emitted: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|r| !r.car_id.is_empty())
        .filter(|r| !known.contains(&r.car_id))
        .filter(|r| emitted.insert(r.car_id.clone()))
        .collect()
}

/// Determine which candidates are new, store them, and return them.
///
/// Nothing is written when there are no survivors. An error from either
/// store call is returned before anything could be notified.
pub async fn diff_and_persist<S>(candidates: Vec<Record>, store: &S) -> Result<Vec<Record>>
where
    S: RecordStore + ?Sized,
{
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let known = store.find_all_ids().await?;
    let fresh = new_records(candidates, &known);
    if fresh.is_empty() {
        return Ok(fresh);
    }

    let written = store.insert_many(&fresh).await?;
    tracing::debug!(candidates = fresh.len(), written, "persisted new records");
    Ok(fresh)
}
