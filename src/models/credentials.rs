use serde::{Deserialize, Serialize};

/// Secrets pasted in by the user. All three values are opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub bearer_token: String,
    pub session_token: String,
    pub workflow_id: String,
}

impl Credentials {
    /// Generation is blocked until a bearer token is present.
    pub fn has_bearer_token(&self) -> bool {
        !self.bearer_token.is_empty()
    }
}

/// What the API reveals about the stored credentials.
#[derive(Debug, Serialize)]
pub struct CredentialsStatus {
    pub bearer_token_set: bool,
    pub session_token_set: bool,
    pub workflow_id: String,
}

impl From<&Credentials> for CredentialsStatus {
    fn from(credentials: &Credentials) -> Self {
        Self {
            bearer_token_set: credentials.has_bearer_token(),
            session_token_set: !credentials.session_token.is_empty(),
            workflow_id: credentials.workflow_id.clone(),
        }
    }
}
