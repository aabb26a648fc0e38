use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt;

/// Plain-text password; `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Hash with Argon2id and a random salt. The result is a PHC string.
pub fn hash_password(password: &Password) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// `true` when `password` matches the stored PHC string.
pub fn verify_password(password: &Password, password_hash: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2_phc() {
        let hash = hash_password(&Password::new("hunter22")).unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn verifies_only_the_right_password() {
        let hash = hash_password(&Password::new("hunter22")).unwrap();

        assert!(verify_password(&Password::new("hunter22"), &hash).unwrap());
        assert!(!verify_password(&Password::new("hunter23"), &hash).unwrap());
    }

    #[test]
    fn salts_differ_per_hash() {
        let password = Password::new("hunter22");
        assert_ne!(
            hash_password(&password).unwrap(),
            hash_password(&password).unwrap()
        );
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password(&Password::new("x"), "not-a-hash").is_err());
    }

    #[test]
    fn debug_hides_the_secret() {
        assert_eq!(format!("{:?}", Password::new("hunter22")), "Password(***)");
    }
}
