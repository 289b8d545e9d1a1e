use serde::{Deserialize, Serialize};

/// Contact record resolved for reminder delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: username.into(),
        }
    }

    pub fn contact(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.username
    }
}
