use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub access_token: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Shared handle to the current authentication state.
///
/// Clones observe the same state, so every repository sees a sign-in or
/// sign-out as soon as it happens.
#[derive(Debug, Clone, Default)]
pub struct Session(Rc<RefCell<Option<AuthUser>>>);

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: AuthUser) -> Self {
        Self(Rc::new(RefCell::new(Some(user))))
    }

    pub fn sign_in(&self, user: AuthUser) {
        tracing::info!(user_id = %user.id, "Signed in");
        *self.0.borrow_mut() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.0.borrow_mut() = None;
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.0.borrow().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.0.borrow().as_ref().map(|u| u.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.borrow().is_some()
    }
}
