use sha2::{Digest, Sha256};

/// Sessions store only the SHA-256 of the bearer token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
