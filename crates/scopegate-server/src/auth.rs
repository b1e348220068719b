use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::Rng;
use rand::rngs::OsRng;

use scopegate_core::CallerIdentity;

const KEY_PREFIX: &str = "scopegate";
const KEY_ID_LEN: usize = 8;
const SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid api key format")]
    InvalidKeyFormat,

    #[error("unknown api key")]
    UnknownKey,

    #[error("api key has been revoked")]
    RevokedKey,

    #[error("internal authentication error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub key_hash: String,
    pub identity: CallerIdentity,
    pub revoked: bool,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub identity: CallerIdentity,
    pub key_id: String,
}

/// Splits `scopegate_<key_id>_<secret>` into its key id and secret.
pub fn parse_api_key(raw_key: &str) -> Result<(&str, &str), AuthError> {
    let parts: Vec<&str> = raw_key.splitn(3, '_').collect();
    if parts.len() != 3 || parts[0] != KEY_PREFIX {
        return Err(AuthError::InvalidKeyFormat);
    }
    let key_id = parts[1];
    let secret = parts[2];
    if key_id.is_empty() || secret.is_empty() {
        return Err(AuthError::InvalidKeyFormat);
    }
    Ok((key_id, secret))
}

pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx: u8 = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Returns `(full_key, secret)`. Only the secret's hash is ever stored.
pub fn generate_api_key() -> (String, String) {
    let key_id = random_token(KEY_ID_LEN);
    let secret = random_token(SECRET_LEN);
    (format!("{KEY_PREFIX}_{key_id}_{secret}"), secret)
}

pub fn authenticate(
    raw_key: &str,
    lookup: impl FnOnce(&str) -> Option<ApiKeyRecord>,
) -> Result<AuthenticatedCaller, AuthError> {
    let (key_id, secret) = parse_api_key(raw_key)?;

    let record = lookup(key_id).ok_or(AuthError::UnknownKey)?;

    if record.revoked {
        return Err(AuthError::RevokedKey);
    }

    if !verify_secret(secret, &record.key_hash)? {
        return Err(AuthError::UnknownKey);
    }

    Ok(AuthenticatedCaller {
        identity: record.identity,
        key_id: record.key_id,
    })
}
