use super::users::UserRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub dni: String,
    pub password: String,
}

// Never print the password
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("dni", &self.dni)
            .field("password", &"***")
            .finish()
    }
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// `data` of `POST /auth/me`
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: UserRecord,
}
