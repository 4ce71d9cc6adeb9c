use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash failed: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Complexity policy: minimum length, mixed case and at least one digit.
/// Symbols are allowed but not required.
pub fn password_policy_violations(plain: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if plain.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if !plain.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("password must contain an uppercase letter".to_string());
    }
    if !plain.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("password must contain a lowercase letter".to_string());
    }
    if !plain.chars().any(|c| c.is_ascii_digit()) {
        problems.push("password must contain a digit".to_string());
    }
    problems
}
