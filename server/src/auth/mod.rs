mod crypto;
mod db;
mod extractor;
mod middleware;

pub use extractor::AuthUser;
#[cfg(test)]
pub(crate) use extractor::AuthenticatedUserId;
pub use middleware::require_auth;
