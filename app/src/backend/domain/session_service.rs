//! Mock session store.
//!
//! There is no authentication protocol: the signed-in user (if any) comes
//! from configuration. Absence of a user means the visitor is a guest.

use async_trait::async_trait;
use shared::{SessionResponse, Submitter, UserSession};
use tracing::{info, warn};

use super::boundaries::SessionProvider;

#[derive(Debug, Clone)]
pub struct SessionService {
    user: Option<UserSession>,
    allow_guest_submissions: bool,
}

impl SessionService {
    pub fn new(user: Option<UserSession>, allow_guest_submissions: bool) -> Self {
        Self {
            user,
            allow_guest_submissions,
        }
    }

    pub fn guest() -> Self {
        Self::new(None, true)
    }

    pub fn current_user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    /// Whether the "Add Tree" affordance should be offered
    pub fn can_add_tree(&self) -> bool {
        self.user.is_some() || self.allow_guest_submissions
    }

    pub fn session_response(&self) -> SessionResponse {
        SessionResponse {
            user: self.user.clone(),
            can_add_tree: self.can_add_tree(),
        }
    }

    /// Resolve who a new tree is attributed to.
    ///
    /// Only the signed-in user can be claimed; anything else becomes the
    /// guest submitter.
    pub fn submitter_for(&self, requested_id: Option<&str>) -> Submitter {
        match (&self.user, requested_id) {
            (Some(user), None) => Self::submitter_from(user),
            (Some(user), Some(requested)) if requested == user.id => Self::submitter_from(user),
            (_, Some(requested)) if requested != Submitter::GUEST_ID => {
                warn!("Unknown submitter '{}', recording tree as guest", requested);
                Submitter::guest()
            }
            _ => Submitter::guest(),
        }
    }

    fn submitter_from(user: &UserSession) -> Submitter {
        Submitter {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[async_trait]
impl SessionProvider for SessionService {
    async fn current_user(&self) -> Option<UserSession> {
        if let Some(user) = &self.user {
            info!("Session user: {}", user.id);
        }
        self.user.clone()
    }
}
