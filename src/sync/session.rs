use serde::{Deserialize, Serialize};

use crate::models::User;

/// The signed-in identity a live view is bound to. Created on sign-in and
/// handed to [`super::Synchronizer::bind`]; dropped on sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub email: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

impl From<&User> for SessionContext {
    fn from(user: &User) -> Self {
        Self::new(&user.id, &user.email)
    }
}
