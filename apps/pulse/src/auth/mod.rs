//! # Auth Module
//!
//! Session tokens, password hashing, the static admin account and the axum
//! extractors that guard user and admin routes.

pub mod extract;
pub mod password;
pub mod token;

pub use extract::{AdminSession, AuthUser};
pub use password::{PasswordError, hash_password, verify_password};
pub use token::{Claims, Role, TokenError, TokenKeys};

use crate::config::AdminCredentials;
use subtle::ConstantTimeEq;

/// Compare a login attempt against the configured admin account in
/// constant time. An unconfigured account never matches.
pub fn admin_credentials_match(admin: &AdminCredentials, username: &str, password: &str) -> bool {
    let (Some(expected_user), Some(expected_pass)) = (&admin.username, &admin.password) else {
        return false;
    };
    let user_ok = expected_user.as_bytes().ct_eq(username.as_bytes());
    let pass_ok = expected_pass.as_bytes().ct_eq(password.as_bytes());
    bool::from(user_ok & pass_ok)
}
