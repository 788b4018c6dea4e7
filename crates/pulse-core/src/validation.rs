//! # Validation Module
//!
//! Request payloads as they arrive over the wire, and the checks that turn
//! them into trusted values. Every field is optional at the serde level so
//! a missing field produces a domain message instead of a decoder error.

use crate::Rating;
use serde::Deserialize;
use thiserror::Error;

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Longest accepted feedback comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields required")]
    MissingSignupFields,

    #[error("Enter a valid email")]
    InvalidEmail,

    #[error("Password must be at least 4 characters")]
    PasswordTooShort,

    #[error("Email and password required")]
    MissingLoginFields,

    #[error("Username and password required")]
    MissingAdminFields,

    #[error("rating(1-5) and comment are required")]
    InvalidFeedback,

    #[error("comment must be at most 5000 characters")]
    CommentTooLong,

    #[error("text is required")]
    MissingText,
}

// =============================================================================
// SIGNUP / LOGIN
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Signup fields after validation. `email` is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupInput {
    pub fn validate(self) -> Result<ValidSignup, ValidationError> {
        let name = non_blank(self.name).ok_or(ValidationError::MissingSignupFields)?;
        let email = non_blank(self.email).ok_or(ValidationError::MissingSignupFields)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingSignupFields)?;

        let email = normalize_email(&email);
        if !is_plausible_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }

        Ok(ValidSignup {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(self) -> Result<ValidLogin, ValidationError> {
        let email = non_blank(self.email).ok_or(ValidationError::MissingLoginFields)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingLoginFields)?;
        Ok(ValidLogin {
            email: normalize_email(&email),
            password,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminLoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AdminLoginInput {
    /// Returns `(username, password)`. The username is trimmed.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let username = non_blank(self.username).ok_or(ValidationError::MissingAdminFields)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingAdminFields)?;
        Ok((username, password))
    }
}

// =============================================================================
// FEEDBACK / PREDICT
// =============================================================================

/// Feedback submission. `rating` accepts a JSON number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackInput {
    pub rating: Option<serde_json::Value>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFeedback {
    pub rating: Rating,
    pub comment: String,
}

impl FeedbackInput {
    pub fn validate(self) -> Result<ValidFeedback, ValidationError> {
        let rating = self
            .rating
            .as_ref()
            .and_then(parse_rating)
            .ok_or(ValidationError::InvalidFeedback)?;
        let comment = non_blank(self.comment).ok_or(ValidationError::InvalidFeedback)?;
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ValidationError::CommentTooLong);
        }
        Ok(ValidFeedback { rating, comment })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictInput {
    pub text: Option<String>,
}

impl PredictInput {
    pub fn validate(self) -> Result<String, ValidationError> {
        non_blank(self.text).ok_or(ValidationError::MissingText)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Trim and lowercase an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn parse_rating(value: &serde_json::Value) -> Option<Rating> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.fract() != 0.0 || !(1.0..=5.0).contains(&number) {
        return None;
    }
    Rating::new(number as u8)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signup(name: &str, email: &str, password: &str) -> SignupInput {
        SignupInput {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn signup_normalizes_email_and_name() {
        let valid = signup("  Ada ", " Ada@Example.COM ", "secret").validate();
        assert_eq!(
            valid,
            Ok(ValidSignup {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "secret".into(),
            })
        );
    }

    #[test]
    fn signup_requires_all_fields() {
        let input = SignupInput {
            name: None,
            ..signup("x", "a@b.c", "pass")
        };
        assert_eq!(input.validate(), Err(ValidationError::MissingSignupFields));
        assert_eq!(
            signup("   ", "a@b.c", "pass").validate(),
            Err(ValidationError::MissingSignupFields)
        );
    }

    #[test]
    fn signup_rejects_bad_email_and_short_password() {
        assert_eq!(
            signup("Ada", "not-an-email", "secret").validate(),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            signup("Ada", "ada@example.com", "abc").validate(),
            Err(ValidationError::PasswordTooShort)
        );
    }

    #[test]
    fn login_requires_both_fields() {
        let input = LoginInput {
            email: Some("a@b.c".into()),
            password: None,
        };
        assert_eq!(input.validate(), Err(ValidationError::MissingLoginFields));
    }

    #[test]
    fn feedback_rating_accepts_numbers_and_numeric_strings() {
        for raw in [json!(3), json!("4"), json!(5.0)] {
            let input = FeedbackInput {
                rating: Some(raw),
                comment: Some("works well".into()),
            };
            assert!(input.validate().is_ok());
        }
    }

    #[test]
    fn feedback_rejects_out_of_range_fractional_and_blank() {
        for raw in [json!(0), json!(6), json!(2.5), json!("abc"), json!(null)] {
            let input = FeedbackInput {
                rating: Some(raw),
                comment: Some("fine".into()),
            };
            assert_eq!(input.validate(), Err(ValidationError::InvalidFeedback));
        }

        let blank = FeedbackInput {
            rating: Some(json!(4)),
            comment: Some("   ".into()),
        };
        assert_eq!(blank.validate(), Err(ValidationError::InvalidFeedback));
    }

    #[test]
    fn feedback_comment_is_trimmed_and_bounded() {
        let ok = FeedbackInput {
            rating: Some(json!(2)),
            comment: Some("  meh  ".into()),
        }
        .validate();
        assert_eq!(ok.map(|f| f.comment), Ok("meh".to_string()));

        let long = FeedbackInput {
            rating: Some(json!(2)),
            comment: Some("x".repeat(MAX_COMMENT_CHARS + 1)),
        };
        assert_eq!(long.validate(), Err(ValidationError::CommentTooLong));
    }

    #[test]
    fn predict_requires_text() {
        assert_eq!(
            PredictInput { text: Some("  ".into()) }.validate(),
            Err(ValidationError::MissingText)
        );
    }

    #[test]
    fn messages_match_api_contract() {
        assert_eq!(
            ValidationError::InvalidFeedback.to_string(),
            "rating(1-5) and comment are required"
        );
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 4 characters"
        );
    }
}
