//! Request authentication gate.
//!
//! Access tokens arrive as `Authorization: Bearer <token>`. The gate validates
//! them with the access secret and hands the verified claims to handlers
//! through the request extensions.

mod extractors;
mod state;

pub use extractors::{Authenticated, BEARER_PREFIX_LEN, authenticate, bearer_token, require_auth};
pub use state::HasSession;
