//! # Error Handling
//!
//! Provides the `AppError` enum used while loading documents and building the index.
//!
//! Failures that happen while *resolving* references are never raised as `AppError`;
//! they are collected as [`crate::resolver::ResolvingError`] values instead.

use derive_more::{Display, From};
use yaml_rust2::scanner::ScanError;

/// The crate-wide construction error.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// The YAML / JSON scanner rejected the input.
    #[display("Failed to parse document: {_0}")]
    Yaml(ScanError),

    /// A document URI or base URI could not be parsed.
    #[display("Invalid URI: {_0}")]
    Uri(url::ParseError),

    /// Two documents were registered under the same URI.
    #[from(ignore)]
    #[display("Document registry error: {_0}")]
    Registry(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_conversion() {
        let err = url::Url::parse("not a url").unwrap_err();
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Uri(_)));
    }

    #[test]
    fn test_string_conversion() {
        // String must land in General, never in Registry
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_registry_manual_creation() {
        let app_err = AppError::Registry("collision".into());
        assert_eq!(format!("{}", app_err), "Document registry error: collision");
    }
}
