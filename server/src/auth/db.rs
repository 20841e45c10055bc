use crate::db::DbPool;
use crate::schema::sessions;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use super::crypto::hash_token;

/// Resolve a bearer token to its user. Sessions are written by the external
/// auth provider; expired ones never match.
pub async fn user_id_from_token(pool: &DbPool, token: &str) -> Option<Uuid> {
    let mut conn = pool.get().ok()?;
    let token_hash = hash_token(token);

    sessions::table
        .filter(sessions::token_hash.eq(&token_hash))
        .filter(sessions::expires_at.gt(Utc::now()))
        .select(sessions::user_id)
        .first(&mut conn)
        .ok()
}
