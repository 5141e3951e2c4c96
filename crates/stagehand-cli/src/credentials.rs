//! Environment-backed credential store
//!
//! Connector configs name credential keys; this is the only place they are
//! resolved against the process environment.

use stagehand_core::connectors::CredentialStore;

/// Resolves credential keys as environment variables
pub struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    fn secret(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variable_is_none() {
        assert!(EnvCredentials.secret("STAGEHAND_TEST_UNSET_KEY").is_none());
    }
}
