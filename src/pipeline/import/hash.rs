use base64::Engine;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for content-derived document ids.
const DOCUMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d2f_1c7a_94be_4f0e_8a53_2b9d_71c4_e018);

/// Compute SHA-256 content hash (base64).
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Stable document id: UUIDv5 over the content hash.
pub fn document_id_for(content_hash: &str) -> Uuid {
    Uuid::new_v5(&DOCUMENT_NAMESPACE, content_hash.as_bytes())
}
