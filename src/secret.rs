use zeroize::Zeroize;

/// Wrapper for sensitive strings (SNMP community, JWT secret).
///
/// `Debug` and `Display` print `[REDACTED]`; the inner value is zeroized on
/// drop. Log lines that need to distinguish communities can use
/// [`SecretString::preview`], which keeps at most the first two characters.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value. Never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Redacted preview for log lines, e.g. "pu**" for "public".
    pub fn preview(&self) -> String {
        match self.0.len() {
            0 => "[redacted]".to_string(),
            1 | 2 => "**".to_string(),
            _ => format!("{}**", &self.0[..2]),
        }
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expose_returns_inner() {
        let secret = SecretString::new("community1");
        assert_eq!(secret.expose(), "community1");
    }

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = SecretString::new("community1");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn preview_keeps_two_chars() {
        assert_eq!(SecretString::new("public").preview(), "pu**");
        assert_eq!(SecretString::new("abc").preview(), "ab**");
        assert_eq!(SecretString::new("ab").preview(), "**");
        assert_eq!(SecretString::new("a").preview(), "**");
        assert_eq!(SecretString::new("").preview(), "[redacted]");
    }

    #[test]
    fn clone_keeps_value() {
        let secret = SecretString::new("public");
        assert_eq!(secret.clone().expose(), "public");
    }
}
