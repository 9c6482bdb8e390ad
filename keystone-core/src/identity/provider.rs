//! Identity provider contract
//!
//! An [`IdentityProvider`] performs the OAuth redirect and code exchange with
//! the external provider and hands back the provider's raw user-info payload.
//! Implementations do network I/O; this crate only consumes their output.

use async_trait::async_trait;
use serde_json::Value;

use crate::Error;

use super::Provider;

/// Trait for external OAuth identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the URL the user agent should be redirected to
    ///
    /// # Arguments
    /// * `provider` - The provider to authenticate against
    /// * `state` - Opaque CSRF state echoed back on the callback
    async fn begin_auth(&self, provider: Provider, state: &str) -> Result<String, Error>;

    /// Exchange the callback code and fetch the user-info payload
    ///
    /// # Arguments
    /// * `provider` - The provider that issued the code
    /// * `code` - The authorization code from the callback
    ///
    /// # Returns
    /// The provider's raw user-info payload, to be passed to [`super::normalize`]
    async fn complete_auth(&self, provider: Provider, code: &str) -> Result<Value, Error>;
}

/// Implementation of IdentityProvider for Box<dyn IdentityProvider>
#[async_trait]
impl IdentityProvider for Box<dyn IdentityProvider> {
    async fn begin_auth(&self, provider: Provider, state: &str) -> Result<String, Error> {
        (**self).begin_auth(provider, state).await
    }

    async fn complete_auth(&self, provider: Provider, code: &str) -> Result<Value, Error> {
        (**self).complete_auth(provider, code).await
    }
}
