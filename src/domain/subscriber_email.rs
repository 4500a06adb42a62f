use validator::validate_email;

// RFC 5321 limits a forward path to 254 characters
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Parses and normalizes an email address: surrounding whitespace is removed and the
    /// address is lowercased, so `Fan@Example.com ` and `fan@example.com` are the same subscriber.
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let normalized = email.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(String::from("email is required"));
        }

        if normalized.len() > MAX_EMAIL_LENGTH {
            return Err(format!(
                "email cannot be longer than {} characters",
                MAX_EMAIL_LENGTH
            ));
        }

        if !validate_email(&normalized) {
            return Err(format!("{} email is not valid", email.trim()));
        }

        Ok(Self(normalized))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
