use serde::{Deserialize, Serialize};

/// Longest user id the store accepts, in characters.
pub const MAX_USER_ID_LEN: usize = 450;

/// Identity of a voter as handed over by the identity layer.
#[derive(Clone, Hash, PartialEq, Eq, Debug, Default, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Anonymous callers carry an empty id
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn is_too_long(&self) -> bool {
        self.0.chars().count() > MAX_USER_ID_LEN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}
