use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

// m=8MB, t=2 iterations, p=1
fn argon2() -> Result<Argon2<'static>, argon2::Error> {
    let params = Params::new(8192, 2, 1, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("Invalid argon2 parameters: {0}")]
    Params(argon2::Error),
    #[error("Password hash error: {0}")]
    Hash(argon2::password_hash::Error),
}

pub fn hash_password(password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()
        .map_err(HashingError::Params)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(HashingError::Hash)?;
    Ok(hash.to_string())
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, HashingError> {
    let parsed_hash = PasswordHash::new(hash).map_err(HashingError::Hash)?;
    Ok(argon2()
        .map_err(HashingError::Params)?
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
