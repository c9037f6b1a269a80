// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Salt => cli::salt(),
        Commands::Hash { salt, password } => cli::hash(salt, password.as_deref())?,
        Commands::Verify {
            salt,
            hash,
            password,
        } => cli::verify(salt, hash, password.as_deref())?,
        Commands::Keygen { out_dir } => cli::keygen(out_dir)?,
        Commands::Resolve { catalog, code } => cli::resolve(catalog, code)?,
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
