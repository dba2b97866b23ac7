//! Per-account API credentials.
//!
//! Credentials are supplied as an ordered list at logon and are never
//! persisted by this crate. The [`Debug`] implementation redacts secrets so
//! credentials can appear in structured logs without leaking.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::AccountId;

// ============================================================================
// Credential
// ============================================================================

/// API credentials for a single trading account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Account the credential authorizes.
    #[serde(rename = "accountId")]
    pub account_id: AccountId,

    /// API key.
    #[serde(rename = "apiKey")]
    pub api_key: String,

    /// API secret.
    #[serde(rename = "apiSecret")]
    pub api_secret: String,

    /// Optional passphrase, required by some venues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account_id", &self.account_id)
            .field("api_key", &self.masked_api_key())
            .field("api_secret", &"<redacted>")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credential {
    /// Creates a credential without a passphrase.
    #[must_use]
    pub fn new(
        account_id: impl Into<AccountId>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: None,
        }
    }

    /// Sets the passphrase.
    #[inline]
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Validates that all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the missing field.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(Error::invalid_request("credential missing account id"));
        }
        if self.api_key.is_empty() {
            return Err(Error::invalid_request(format!(
                "credential for account {} missing API key",
                self.account_id
            )));
        }
        if self.api_secret.is_empty() {
            return Err(Error::invalid_request(format!(
                "credential for account {} missing API secret",
                self.account_id
            )));
        }
        Ok(())
    }

    /// Returns a masked version of the API key for logging purposes.
    ///
    /// Shows first 4 and last 4 characters with ellipsis in between.
    /// For keys of 8 characters or fewer, shows asterisks only.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.as_str();
        let len = key.len();

        if len <= 8 {
            "*".repeat(len)
        } else {
            format!("{}...{}", &key[..4], &key[len - 4..])
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const API_KEY: &str = "test_api_key_123";
    const API_SECRET: &str = "test_secret_456";

    #[test]
    fn test_validate_ok() {
        let credential = Credential::new("ACC-1", API_KEY, API_SECRET);
        assert!(credential.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_api_key() {
        let credential = Credential::new("ACC-1", "", API_SECRET);
        let err = credential.validate().unwrap_err();
        assert!(err.is_build_error());
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_validate_missing_account() {
        let credential = Credential::new("", API_KEY, API_SECRET);
        assert!(credential.validate().is_err());
    }

    #[test]
    fn test_masked_api_key() {
        let credential = Credential::new("ACC-1", API_KEY, API_SECRET);
        assert_eq!(credential.masked_api_key(), "test..._123");
    }

    #[test]
    fn test_masked_api_key_short() {
        let credential = Credential::new("ACC-1", "short", API_SECRET);
        assert_eq!(credential.masked_api_key(), "*****");
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let credential =
            Credential::new("ACC-1", API_KEY, API_SECRET).with_passphrase("hunter2");
        let debug_string = format!("{credential:?}");

        assert!(!debug_string.contains(API_SECRET));
        assert!(!debug_string.contains("hunter2"));
        assert!(debug_string.contains("<redacted>"));
    }

    #[test]
    fn test_wire_field_names() {
        let credential = Credential::new("ACC-1", API_KEY, API_SECRET);
        let json = serde_json::to_string(&credential).expect("serialize");

        assert!(json.contains("accountId"));
        assert!(json.contains("apiKey"));
        assert!(json.contains("apiSecret"));
        assert!(!json.contains("passphrase"));
    }
}
