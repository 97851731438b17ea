//! Secret values and where they come from.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

/// Credential string whose `Debug` and `Display` never print the value.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

pub type SecretFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// Secret lookup backend. `Ok(None)` means the key is not set.
pub trait VaultProvider: Send + Sync {
    fn get_secret(&self, key: &str) -> SecretFuture<'_>;
}

/// Reads secrets from process environment variables. Blank values count as
/// unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVaultProvider;

impl VaultProvider for EnvVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Box::pin(async move { Ok(value) })
    }
}

/// Fixed key/value secrets, for embedding and tests.
#[derive(Default)]
pub struct StaticVaultProvider {
    secrets: HashMap<String, String>,
}

impl fmt::Debug for StaticVaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticVaultProvider")
            .field("secrets", &format_args!("[{} secrets]", self.secrets.len()))
            .finish()
    }
}

impl StaticVaultProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, key: &str, value: &str) -> Self {
        self.secrets.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl VaultProvider for StaticVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = self.secrets.get(key).cloned();
        Box::pin(async move { Ok(value) })
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn secret_is_redacted() {
        let secret = Secret::new("ghp_abc123");
        assert_eq!(secret.expose(), "ghp_abc123");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn secret_deserializes_transparently() {
        let secret: Secret = serde_json::from_str("\"sk-test\"").unwrap();
        assert_eq!(secret.expose(), "sk-test");
    }

    #[tokio::test]
    #[serial]
    async fn env_vault_reads_variable() {
        let key = "GITCTX_TEST_VAULT_SECRET";
        unsafe { std::env::set_var(key, "value") };
        let result = EnvVaultProvider.get_secret(key).await.unwrap();
        unsafe { std::env::remove_var(key) };
        assert_eq!(result.as_deref(), Some("value"));
    }

    #[tokio::test]
    #[serial]
    async fn env_vault_treats_blank_as_unset() {
        let key = "GITCTX_TEST_VAULT_BLANK";
        unsafe { std::env::set_var(key, "   ") };
        let result = EnvVaultProvider.get_secret(key).await.unwrap();
        unsafe { std::env::remove_var(key) };
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn env_vault_unset_is_none() {
        let result = EnvVaultProvider
            .get_secret("GITCTX_TEST_VAULT_NEVER_SET_98765")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn static_vault_lookup() {
        let vault = StaticVaultProvider::new().with_secret("GITHUB_TOKEN", "t");
        assert_eq!(vault.get_secret("GITHUB_TOKEN").await.unwrap().as_deref(), Some("t"));
        assert!(vault.get_secret("OPENAI_API_KEY").await.unwrap().is_none());
        assert_eq!(format!("{vault:?}"), "StaticVaultProvider { secrets: [1 secrets] }");
    }
}
