//! Password hashing via Argon2id.
//!
//! The algorithm, parameters and salt encoding are a wire contract: the
//! diary app hashes with the same settings and the server must produce
//! bit-identical output. Salts travel as base64 and are always decoded to
//! raw bytes before hashing.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::{Rng, rng};
use subtle::ConstantTimeEq;

use super::AuthError;

/// Minimum decoded salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Length of salts produced by [`generate_salt`].
pub const SALT_LEN: usize = 16;

/// Fixed salt for timing-equalisation work; never used for a real account.
const DUMMY_SALT: [u8; SALT_LEN] = *b"hht-dummy-salt!!";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Output length in bytes.
    pub output_len: usize,
}

impl HashParams {
    /// The shared client/server parameter set: 64 MiB, 3 passes, 4 lanes,
    /// 32-byte output.
    pub const SHARED: Self = Self {
        memory_kib: 65_536,
        iterations: 3,
        parallelism: 4,
        output_len: 32,
    };

    fn hasher(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| AuthError::Internal(format!("argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self::SHARED
    }
}

/// Generate a random base64-encoded salt of [`SALT_LEN`] bytes.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rng().fill(&mut bytes);
    STANDARD.encode(bytes)
}

/// Decode a base64 salt and check its length.
pub fn decode_salt(salt: &str) -> Result<Vec<u8>, AuthError> {
    let bytes = STANDARD
        .decode(salt)
        .map_err(|e| AuthError::Encoding(format!("salt: {e}")))?;
    if bytes.len() < MIN_SALT_LEN {
        return Err(AuthError::InvalidSaltLength(bytes.len()));
    }
    Ok(bytes)
}

fn hash_raw(password: &str, salt: &[u8], params: &HashParams) -> Result<Vec<u8>, AuthError> {
    let mut out = vec![0u8; params.output_len];
    params
        .hasher()?
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| AuthError::Internal(format!("argon2 hash: {e}")))?;
    Ok(out)
}

/// Hash `password` with a base64 `salt`, returning the base64 hash.
pub fn hash_password(password: &str, salt: &str, params: &HashParams) -> Result<String, AuthError> {
    let salt = decode_salt(salt)?;
    Ok(STANDARD.encode(hash_raw(password, &salt, params)?))
}

/// Verify `password` against a stored base64 `hash` in constant time.
pub fn verify_password(
    password: &str,
    salt: &str,
    hash: &str,
    params: &HashParams,
) -> Result<bool, AuthError> {
    let salt = decode_salt(salt)?;
    let expected = STANDARD
        .decode(hash)
        .map_err(|e| AuthError::Encoding(format!("hash: {e}")))?;
    let computed = hash_raw(password, &salt, params)?;
    Ok(computed.ct_eq(&expected).into())
}

/// Spend one hash worth of work without a real credential.
///
/// Used when the username is unknown so the response takes as long as a
/// genuine password check.
pub fn verify_against_dummy(password: &str, params: &HashParams) -> Result<(), AuthError> {
    hash_raw(password, &DUMMY_SALT, params).map(|_| ())
}
