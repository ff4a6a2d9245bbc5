//! Countersign CLI - key provisioning, signing, purchase authorization and audit queries.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use countersign_authz::AuthzConfig;
use countersign_core::Algorithm;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod output;
mod secret;

use commands::{audit, authorize, canonicalize, provision, public_key, sign, verify};
use secret::SecretSource;

#[derive(Parser)]
#[command(name = "countersign")]
#[command(about = "Signed purchase authorization: keys, signatures and audit trail")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// TOML configuration file
    #[arg(long, env = "COUNTERSIGN_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Directory holding one key record per user
    #[arg(
        long,
        env = "COUNTERSIGN_KEY_DIR",
        default_value = "countersign-keys",
        global = true
    )]
    key_dir: PathBuf,
    /// Audit journal file
    #[arg(
        long,
        env = "COUNTERSIGN_AUDIT_JOURNAL",
        default_value = "countersign-audit.csa",
        global = true
    )]
    audit_journal: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<PathBuf>,
    },
    /// Generate and seal a key pair for a user
    Provision {
        /// User id
        user: String,
        #[command(flatten)]
        secret: SecretSource,
        /// ES256 or RS256 (default from config)
        #[arg(long)]
        algorithm: Option<Algorithm>,
    },
    /// Print a user's public JWK
    PublicKey {
        /// User id
        user: String,
    },
    /// Sign a payload with a user's sealed key
    Sign {
        /// User id
        user: String,
        /// Payload JSON file (or stdin if not provided)
        input: Option<PathBuf>,
        #[command(flatten)]
        secret: SecretSource,
    },
    /// Check a signature against a public JWK
    Verify {
        /// Public JWK file
        #[arg(long)]
        public_key: PathBuf,
        /// Base64 signature
        #[arg(long)]
        signature: String,
        /// Payload JSON file (or stdin if not provided)
        input: Option<PathBuf>,
    },
    /// Run the full authorization pipeline (exit status 2 on rejection)
    Authorize {
        /// User id
        user: String,
        /// Base64 signature
        #[arg(long)]
        signature: String,
        /// Payload JSON file (or stdin if not provided)
        input: Option<PathBuf>,
        /// Client address to record in the audit trail
        #[arg(long)]
        client_ip: Option<String>,
    },
    /// List audit records
    Audit {
        /// Only records for this user
        #[arg(long)]
        user: Option<String>,
        /// Only records with this action
        #[arg(long)]
        action: Option<String>,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
        /// Check the hash chain instead of listing
        #[arg(long)]
        verify_chain: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AuthzConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(AuthzConfig::load(path)?),
        None => Ok(AuthzConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let paths = commands::Paths {
        key_dir: cli.key_dir,
        audit_journal: cli.audit_journal,
    };

    let result = match cli.command {
        Commands::Canonicalize { input } => canonicalize::run(input).map(|()| 0),
        Commands::Provision {
            user,
            secret,
            algorithm,
        } => provision::run(&paths, &config, user, secret, algorithm).map(|()| 0),
        Commands::PublicKey { user } => public_key::run(&paths, user).map(|()| 0),
        Commands::Sign {
            user,
            input,
            secret,
        } => sign::run(&paths, user, input, secret).map(|()| 0),
        Commands::Verify {
            public_key,
            signature,
            input,
        } => verify::run(public_key, signature, input).map(|valid| if valid { 0 } else { 1 }),
        Commands::Authorize {
            user,
            signature,
            input,
            client_ip,
        } => authorize::run(&paths, &config, user, signature, input, client_ip)
            .map(|authorized| if authorized { 0 } else { 2 }),
        Commands::Audit {
            user,
            action,
            json,
            verify_chain,
        } => audit::run(&paths, user, action, json, verify_chain).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
