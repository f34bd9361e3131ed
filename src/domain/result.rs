//! Result type alias for Veil

use super::errors::VeilError;

/// Result type alias for Veil operations
///
/// # Examples
///
/// ```
/// use veil::domain::result::Result;
/// use veil::domain::errors::VeilError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(VeilError::InvalidInput("payload is not text".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, VeilError>;
