use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
}

/// Holder of the bearer credential shared by every backend request.
///
/// The login operation is the only writer. A later login overwrites the
/// previous token; there is no expiry tracking and no way back to
/// [`SessionStatus::Unauthenticated`].
#[derive(Debug, Default)]
pub struct SessionState {
    token: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|err| err.into_inner());
        *guard = Some(token.into());
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn status(&self) -> SessionStatus {
        if self.get().is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}
