use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// PHC string stored in `auth_identities.password_hash`. CPU bound; callers
/// on the runtime go through `spawn_blocking`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow::anyhow!("hash credential: {e}"))
}
