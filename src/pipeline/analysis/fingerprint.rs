use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Fingerprint;

/// Identity of an evaluation: SHA-256 (hex) over the company id, the sorted
/// and de-duplicated document ids, and the rubric version.
pub fn evaluation_fingerprint(company_id: &str, document_ids: &[Uuid], rubric_version: &str) -> Fingerprint {
    let mut ids = document_ids.to_vec();
    ids.sort();
    ids.dedup();

    let mut hasher = Sha256::new();
    hasher.update(company_id.as_bytes());
    hasher.update([0u8]);
    for id in &ids {
        hasher.update(id.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(rubric_version.as_bytes());

    Fingerprint::from_hex(format!("{:x}", hasher.finalize()))
}
