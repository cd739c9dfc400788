//! Authentication state trait and macro.

use std::sync::Arc;

use crate::session::SessionManager;

/// Trait for state types that provide the session manager for authentication.
pub trait HasSession {
    fn session(&self) -> &SessionManager;
}

impl HasSession for Arc<SessionManager> {
    fn session(&self) -> &SessionManager {
        self
    }
}

/// Macro to implement `HasSession` for state structs with a
/// `session: Arc<SessionManager>` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub session: Arc<SessionManager>,
///     // ... other fields
/// }
///
/// tokengate::impl_has_session!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_session {
    ($state_type:ty) => {
        impl $crate::auth::HasSession for $state_type {
            fn session(&self) -> &$crate::session::SessionManager {
                &self.session
            }
        }
    };
}
