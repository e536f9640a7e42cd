//! Registry credentials in the form the container daemon expects
//!
//! The daemon takes credentials for pull and push as the `X-Registry-Auth`
//! header: a base64 encoded JSON object with `username`, `password` and
//! `serveraddress`. Configured credentials are stored in that encoded form.

use crate::error::{Result, SyncError};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::{Deserialize, Serialize};

/// Encoded form of an empty credential (`{}`)
pub const ANONYMOUS_AUTH: &str = "e30=";

/// Login issued by a credential service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryToken {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAuth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub serveraddress: String,
}

impl RegistryAuth {
    pub fn new(username: &str, password: &str, serveraddress: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            serveraddress: serveraddress.to_string(),
        }
    }

    pub fn from_token(token: &RegistryToken, serveraddress: &str) -> Self {
        Self::new(&token.username, &token.password, serveraddress)
    }

    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a configured credential; both base64 alphabets are accepted
    pub fn decode(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let bytes = STANDARD
            .decode(encoded)
            .or_else(|_| URL_SAFE.decode(encoded))
            .map_err(|e| SyncError::Auth(format!("Invalid credential encoding: {}", e)))?;
        let auth = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::Auth(format!("Invalid credential content: {}", e)))?;
        Ok(auth)
    }

    /// Header value for a stored credential; empty means anonymous
    pub fn header_value(encoded: &str) -> &str {
        if encoded.trim().is_empty() {
            ANONYMOUS_AUTH
        } else {
            encoded
        }
    }
}
