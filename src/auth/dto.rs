use serde::Deserialize;

/// Registration and login both post username + password (+ csrf_token,
/// which the guard consumes before the handler runs).
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
