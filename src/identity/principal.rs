use serde::{Deserialize, Serialize};

/// The external auth provider's record of a signed-in user.
/// Owned by the provider; the portal core only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new<S: Into<String>>(id: S, email: S, display_name: S) -> Self {
        Self { id: id.into(), email: email.into(), display_name: display_name.into(), avatar_url: None }
    }

    pub fn with_avatar<S: Into<String>>(mut self, url: S) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}
