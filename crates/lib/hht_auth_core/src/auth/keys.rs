//! Ed25519 signing key material for session tokens.
//!
//! The pair is resolved once at startup and handed to the token service;
//! components that only verify receive the public half.

use std::path::{Path, PathBuf};

use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use rand::{Rng, rng};
use tracing::{info, warn};

use super::AuthError;

const PRIVATE_KEY_FILE: &str = "token-ed25519.pem";
const PUBLIC_KEY_FILE: &str = "token-ed25519.pub.pem";

/// PEM-encoded Ed25519 key pair (PKCS#8 private key, SPKI public key).
#[derive(Clone)]
pub struct TokenKeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

impl std::fmt::Debug for TokenKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeyPair")
            .field("private_pem", &"<redacted>")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

impl TokenKeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Result<Self, AuthError> {
        let mut seed = [0u8; 32];
        rng().fill(&mut seed);
        let key = SigningKey::from_bytes(&seed);
        let private_pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal(format!("encode private key: {e}")))?;
        let public_pem = key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal(format!("encode public key: {e}")))?;
        Ok(Self {
            private_pem: private_pem.as_str().to_owned(),
            public_pem,
        })
    }

    /// Read a pair from two PEM files.
    pub fn from_files(private: &Path, public: &Path) -> Result<Self, AuthError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path)
                .map_err(|e| AuthError::Internal(format!("read {}: {e}", path.display())))
        };
        Ok(Self {
            private_pem: read(private)?,
            public_pem: read(public)?,
        })
    }

    /// Write both halves into `dir`, returning the (private, public) paths.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf), AuthError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| AuthError::Internal(format!("create {}: {e}", dir.display())))?;
        let private = dir.join(PRIVATE_KEY_FILE);
        let public = dir.join(PUBLIC_KEY_FILE);
        write_key_file(&private, &self.private_pem, PRIVATE_KEY_MODE)?;
        write_key_file(&public, &self.public_pem, PUBLIC_KEY_MODE)?;
        Ok((private, public))
    }
}

const PRIVATE_KEY_MODE: u32 = 0o600;
const PUBLIC_KEY_MODE: u32 = 0o644;

/// Write `contents` to `path`, owner-only when `mode` says so.
///
/// Permissions are reapplied to an existing file too, since `mode` only
/// takes effect on creation.
fn write_key_file(path: &Path, contents: &str, mode: u32) -> Result<(), AuthError> {
    use std::io::Write;

    let err = |e: std::io::Error| AuthError::Internal(format!("write {}: {e}", path.display()));
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(mode);
        let mut file = options.open(path).map_err(err)?;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(err)?;
        file.write_all(contents.as_bytes()).map_err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        let mut file = options.open(path).map_err(err)?;
        file.write_all(contents.as_bytes()).map_err(err)
    }
}

/// Resolve the signing keys.
///
/// `TOKEN_PRIVATE_KEY_PATH` + `TOKEN_PUBLIC_KEY_PATH` → pair persisted in
/// the data dir → newly generated pair, persisted for the next start.
pub fn resolve_signing_keys() -> Result<TokenKeyPair, AuthError> {
    if let (Ok(private), Ok(public)) = (
        std::env::var("TOKEN_PRIVATE_KEY_PATH"),
        std::env::var("TOKEN_PUBLIC_KEY_PATH"),
    ) && !private.is_empty()
        && !public.is_empty()
    {
        return TokenKeyPair::from_files(Path::new(&private), Path::new(&public));
    }

    let dir = key_dir();
    let (private, public) = (dir.join(PRIVATE_KEY_FILE), dir.join(PUBLIC_KEY_FILE));
    if private.exists() && public.exists() {
        return TokenKeyPair::from_files(&private, &public);
    }

    let pair = TokenKeyPair::generate()?;
    match pair.write_to_dir(&dir) {
        Ok(_) => info!(path = %dir.display(), "generated new token signing keys"),
        Err(e) => warn!(error = %e, "generated token signing keys could not be persisted"),
    }
    Ok(pair)
}

/// Directory holding persisted token keys.
fn key_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hht_auth")
}
