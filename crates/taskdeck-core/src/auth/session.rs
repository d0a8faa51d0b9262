use super::credentials::PersistedCredential;

/// Who is signed in. Replaced wholesale on every login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub email: String,
}

/// An authenticated session. Identity and token only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: UserIdentity,
    pub token: String,
}

impl From<PersistedCredential> for Session {
    fn from(credential: PersistedCredential) -> Self {
        Self {
            identity: UserIdentity {
                email: credential.email,
            },
            token: credential.token,
        }
    }
}

impl Session {
    pub fn to_credential(&self) -> PersistedCredential {
        PersistedCredential {
            token: self.token.clone(),
            email: self.identity.email.clone(),
        }
    }
}

/// Authentication state as seen by the routing layer.
///
/// `Pending` means the persisted credential has not been read yet; it is
/// not the same as `Unauthenticated`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Pending,
    Authenticated(Session),
    Unauthenticated,
}

impl AuthState {
    pub fn is_pending(&self) -> bool {
        matches!(self, AuthState::Pending)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}
