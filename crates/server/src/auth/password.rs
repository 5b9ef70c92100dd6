//! Password hashing, password rules and random tokens.
//!
//! Uses Argon2id for password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Shortest password accepted at registration and reset.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Random bytes in a reset token before hex encoding.
pub const RESET_TOKEN_BYTES: usize = 20;

pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";

/// Hash a password using Argon2id.
///
/// Returns the PHC-formatted hash string suitable for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Check a new password and its confirmation.
///
/// Every failing rule is reported, in a fixed order.
pub fn password_errors(password: &str, confirmation: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password != confirmation {
        errors.push(PASSWORDS_DO_NOT_MATCH.to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(PASSWORD_TOO_SHORT.to_string());
    }
    errors
}

/// Generate a password reset token: 20 random bytes, hex encoded.
pub fn generate_reset_token() -> Result<String, getrandom::Error> {
    random_hex::<RESET_TOKEN_BYTES>()
}

/// Generate the anti-forgery `state` for a Google sign-in round trip.
pub fn generate_state_token() -> Result<String, getrandom::Error> {
    random_hex::<16>()
}

fn random_hex<const N: usize>() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; N];
    getrandom::fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}
