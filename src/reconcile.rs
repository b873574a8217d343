// File: src/reconcile.rs
// Deduplicate and rank verified mints for one block

use std::collections::HashSet;

use crate::data_models::VerifiedMint;

/// Collapse duplicates by inscription id (first discovery wins), then rank by
/// inscription number ascending. The sort is stable, so ties and unresolved
/// numbers keep discovery order; unresolved numbers rank after every known one.
pub fn reconcile(mints: Vec<VerifiedMint>) -> Vec<VerifiedMint> {
    let mut seen = HashSet::new();
    let mut unique: Vec<VerifiedMint> = mints
        .into_iter()
        .filter(|mint| seen.insert(mint.inscription_id.clone()))
        .collect();

    unique.sort_by_key(|mint| (mint.inscription_number.is_none(), mint.inscription_number));
    unique
}
