//! Session-backed identity provider.

use crate::adapters::IdentityProvider;
use helio_core::UserId;
use std::sync::RwLock;

/// Holds the identity of the signed-in user, if any.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    /// A session with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self {
            current: RwLock::new(Some(user.into())),
        }
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(user.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_identity(&self) -> Option<UserId> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}
