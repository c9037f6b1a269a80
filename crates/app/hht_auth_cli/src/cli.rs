use std::io::BufRead;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hht_auth_core::auth::keys::TokenKeyPair;
use hht_auth_core::auth::password::{self, HashParams};
use hht_auth_core::sponsor::catalog::SponsorCatalog;
use log::info;

use crate::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "hht-auth", version, about = "HHT diary auth tooling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a fresh random base64 salt
    Salt,

    /// Hash a password with the shared Argon2id parameters
    Hash {
        /// Base64 salt (at least 16 decoded bytes)
        #[arg(long)]
        salt: String,
        /// Password; read from the first line of stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Check a password against a base64 hash and salt
    Verify {
        #[arg(long)]
        salt: String,
        #[arg(long)]
        hash: String,
        /// Password; read from the first line of stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Generate an Ed25519 token signing key pair
    Keygen {
        /// Directory to write the PEM files into
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Resolve a linking code against a sponsor catalog
    Resolve {
        /// Sponsor catalog YAML file
        #[arg(long)]
        catalog: PathBuf,
        code: String,
    },

    /// Print version
    Version,
}

pub fn salt() {
    println!("{}", password::generate_salt());
}

pub fn hash(salt: &str, password: Option<&str>) -> Result<()> {
    let password = password_or_stdin(password)?;
    let hash = password::hash_password(&password, salt, &HashParams::SHARED)?;
    println!("{hash}");
    Ok(())
}

pub fn verify(salt: &str, hash: &str, password: Option<&str>) -> Result<()> {
    let password = password_or_stdin(password)?;
    if !password::verify_password(&password, salt, hash, &HashParams::SHARED)? {
        return Err(Error::Custom("password does not match".into()));
    }
    println!("ok");
    Ok(())
}

pub fn keygen(out_dir: &Path) -> Result<()> {
    let pair = TokenKeyPair::generate()?;
    let (private, public) = pair.write_to_dir(out_dir)?;
    info!("wrote {}", private.display());
    info!("wrote {}", public.display());
    println!("{}", public.display());
    Ok(())
}

pub fn resolve(catalog: &Path, code: &str) -> Result<()> {
    let (resolver, _) = SponsorCatalog::load(catalog)?.into_parts()?;
    let pattern = resolver
        .find_by_linking_code(code)
        .ok_or_else(|| Error::Custom(format!("no sponsor for linking code {code:?}")))?;
    println!(
        "{}\t{}\t{}",
        pattern.tenant_id, pattern.tenant_name, pattern.portal_url
    );
    Ok(())
}

/// The given password, or the first stdin line without its line ending.
fn password_or_stdin(password: Option<&str>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p.to_string());
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(trimmed.to_string())
}
