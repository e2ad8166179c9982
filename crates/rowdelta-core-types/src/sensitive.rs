//! Sensitive data marker for automatic redaction
//!
//! Values destined for `hash` fields are usually personal data (emails,
//! account numbers). The encoder keeps them inside `Sensitive<T>` until
//! they are digested, so a stray `{:?}` never puts them in a log line.

use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use rowdelta_core_types::Sensitive;
///
/// let email = Sensitive::new("jane@example.com");
/// assert_eq!(format!("{:?}", email), "***REDACTED***");
/// assert_eq!(format!("{}", email), "***REDACTED***");
///
/// // The digest step still sees the real value
/// assert_eq!(email.expose(), &"jane@example.com");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value
    ///
    /// Only the digest computation should need this.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let email = Sensitive::new("jane@example.com");
        let debug_str = format!("{:?}", email);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("jane"));
    }

    #[test]
    fn test_display_is_redacted() {
        let account = Sensitive::new(String::from("DE44 5001 0517 5407 3249 31"));
        assert_eq!(format!("{}", account), "***REDACTED***");
    }

    #[test]
    fn test_expose_and_into_inner() {
        let secret = Sensitive::new(String::from("raw"));
        assert_eq!(secret.expose(), "raw");
        assert_eq!(secret.clone().into_inner(), "raw");
    }

    #[test]
    fn test_redacted_inside_struct_debug() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct HashInput {
            field: &'static str,
            input: Sensitive<String>,
        }

        let input = HashInput {
            field: "email",
            input: Sensitive::new("jane@example.com".to_string()),
        };

        let debug_str = format!("{:?}", input);
        assert!(debug_str.contains("email"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("jane@example.com"));
    }
}
