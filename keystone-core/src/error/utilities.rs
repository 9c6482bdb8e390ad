use crate::{
    Error,
    error::{ConfigurationError, IdentityError},
};

/// Extension trait for Result types to simplify identity provider error mapping
///
/// Identity providers wrap arbitrary HTTP and parsing failures; this converts
/// them into [`IdentityError::Provider`] so they surface with a 502.
///
/// # Example
///
/// ```rust,ignore
/// use keystone_core::error::utilities::ProviderResultExt;
///
/// let payload = client.fetch_user_info(&token).await.map_provider_err()?;
/// ```
pub trait ProviderResultExt<T> {
    /// Convert any displayable error to an identity provider error
    fn map_provider_err(self) -> Result<T, Error>;

    /// Convert any displayable error to an identity provider error with additional context
    fn map_provider_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> ProviderResultExt<T> for Result<T, E> {
    fn map_provider_err(self) -> Result<T, Error> {
        self.map_err(|e| Error::Identity(IdentityError::Provider(e.to_string())))
    }

    fn map_provider_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| Error::Identity(IdentityError::Provider(format!("{context}: {e}"))))
    }
}

/// Extension trait for Option types to simplify required payload field checks
///
/// # Example
///
/// ```rust
/// use keystone_core::error::utilities::RequiredFieldExt;
///
/// let id: Option<String> = None;
/// assert!(id.require_field("id").is_err());
/// ```
pub trait RequiredFieldExt<T> {
    /// Convert None to an [`IdentityError::MalformedPayload`]
    fn require_field(self, field_name: &str) -> Result<T, IdentityError>;
}

impl<T> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, IdentityError> {
        self.ok_or_else(|| IdentityError::MalformedPayload(format!("{field_name} is required")))
    }
}

/// Macro to reject a configuration value that fails a predicate
///
/// # Example
///
/// ```rust
/// use keystone_core::ensure_config;
/// use keystone_core::error::ConfigurationError;
///
/// fn check(limit: usize) -> Result<(), keystone_core::Error> {
///     ensure_config!(limit >= 1, ConfigurationError::InvalidSessionLimit);
///     Ok(())
/// }
/// assert!(check(0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($crate::Error::Configuration($err));
        }
    };
}

/// Build a [`ConfigurationError::Invalid`] from anything displayable
pub fn invalid_config(e: impl std::fmt::Display) -> Error {
    Error::Configuration(ConfigurationError::Invalid(e.to_string()))
}
