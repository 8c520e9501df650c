//! LockNest command-line front-end.
//!
//! Every command that touches the vault signs in with `--pin` first. Keys live
//! in the OS keyring; the vault and preferences are encrypted files in the
//! data directory.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use directories::ProjectDirs;
use tracing::{debug, info};

use locknest_core::auth::{LaunchPrompt, NoBiometric, SensitiveOperation};
use locknest_core::security::{estimate_strength, CredentialGenerator, GeneratorOptions, KeyringKeyStore};
use locknest_core::storage::{load_config, write_private_file, DataPaths};
use locknest_core::vault::{Category, CredentialEntry, EntryFields, EntryFilter};
use locknest_core::LockNest;

/// LockNest credential vault
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate random secrets
    Generate {
        #[command(flatten)]
        options: GenerateArgs,
        /// How many secrets to print
        #[arg(long, default_value = "1")]
        count: usize,
    },
    /// Estimate the strength of a secret
    Strength { secret: String },
    /// Choose the PIN on first use
    Setup {
        #[arg(long)]
        pin: String,
        #[arg(long)]
        confirm: String,
    },
    /// Store a new credential
    Add {
        #[command(flatten)]
        auth: PinArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        username: String,
        /// Secret to store; a random one is generated when omitted
        #[arg(long)]
        secret: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, default_value = "General")]
        category: Category,
    },
    /// List stored credentials (secrets are not shown)
    List {
        #[command(flatten)]
        auth: PinArg,
        #[arg(long)]
        category: Option<Category>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List categories in use
    Categories {
        #[command(flatten)]
        auth: PinArg,
    },
    /// Delete a credential by id
    Delete {
        #[command(flatten)]
        auth: PinArg,
        id: String,
    },
    /// Change the PIN
    ChangePin {
        #[command(flatten)]
        auth: PinArg,
        #[arg(long)]
        new_pin: String,
        #[arg(long)]
        confirm: String,
    },
    /// Write an encrypted backup of the whole vault
    Export {
        #[command(flatten)]
        auth: PinArg,
        file: PathBuf,
    },
    /// Restore entries from an encrypted backup
    Import {
        #[command(flatten)]
        auth: PinArg,
        file: PathBuf,
    },
    /// Print a report grouped by category
    Report {
        #[command(flatten)]
        auth: PinArg,
        /// Include secrets (re-checks the PIN)
        #[arg(long)]
        reveal: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show or change security settings
    Settings {
        #[command(flatten)]
        auth: PinArg,
        #[arg(long)]
        biometric: Option<bool>,
        #[arg(long)]
        auto_lock: Option<bool>,
        #[arg(long)]
        auto_lock_minutes: Option<u32>,
    },
}

#[derive(ClapArgs, Debug)]
struct PinArg {
    /// Current PIN
    #[arg(long)]
    pin: String,
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    #[arg(short, long)]
    length: Option<usize>,
    #[arg(long)]
    no_uppercase: bool,
    #[arg(long)]
    no_lowercase: bool,
    #[arg(long)]
    no_digits: bool,
    #[arg(long)]
    no_special: bool,
}

impl GenerateArgs {
    fn to_options(&self, defaults: &GeneratorOptions) -> GeneratorOptions {
        GeneratorOptions {
            length: self.length.unwrap_or(defaults.length),
            uppercase: defaults.uppercase && !self.no_uppercase,
            lowercase: defaults.lowercase && !self.no_lowercase,
            digits: defaults.digits && !self.no_digits,
            special: defaults.special && !self.no_special,
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "LockNest", "LockNest")
        .context("Could not determine a data directory; pass --data-dir")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn open_core(data_dir: Option<PathBuf>) -> Result<LockNest> {
    let paths = DataPaths::new(match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    });
    let config = load_config(&paths.config_path())
        .with_context(|| format!("Failed to load {:?}", paths.config_path()))?;
    let key_store = Arc::new(KeyringKeyStore::new(config.keyring_service.clone()));
    LockNest::open(paths, config, key_store).context("Failed to open the vault")
}

/// Sign in with `pin`, failing if no PIN has been set up.
fn sign_in(core: &LockNest, pin: &str) -> Result<()> {
    let mut auth = core.authenticator(Arc::new(NoBiometric));
    if auth.launch()? == LaunchPrompt::FirstTimeSetup {
        bail!("No PIN set. Run `locknest setup` first.");
    }
    auth.submit_pin(pin)?;
    debug!("Signed in");
    Ok(())
}

/// Encrypt the whole vault, then replace `file` atomically. An existing
/// backup is left untouched when encryption fails.
fn export_to_file(core: &LockNest, file: &Path) -> Result<usize> {
    let bytes = core.backup.export_all()?;
    write_private_file(file, &bytes).with_context(|| format!("Failed to write {:?}", file))?;
    Ok(bytes.len())
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locknest=info,locknest_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Generate { options, count } => {
            let config = match &args.data_dir {
                Some(dir) => load_config(&DataPaths::new(dir).config_path())?,
                None => Default::default(),
            };
            let options = options.to_options(&config.generator);
            let mut generator = CredentialGenerator::default();
            for _ in 0..count {
                println!("{}", generator.generate(&options)?);
            }
        }
        Command::Strength { secret } => {
            println!("{}", estimate_strength(&secret));
        }
        Command::Setup { pin, confirm } => {
            let core = open_core(args.data_dir)?;
            let mut auth = core.authenticator(Arc::new(NoBiometric));
            if auth.launch()? != LaunchPrompt::FirstTimeSetup {
                bail!("A PIN is already set. Use `locknest change-pin`.");
            }
            auth.submit_pin(&pin)?;
            auth.submit_pin(&confirm)?;
            info!("PIN set up at {:?}", core.paths.root());
            println!("PIN set.");
        }
        Command::Add {
            auth,
            title,
            username,
            secret,
            website,
            notes,
            category,
        } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let generated = secret.is_none();
            let secret = match secret {
                Some(secret) => secret,
                None => core.generate_secret()?,
            };
            let mut fields = EntryFields::new(title, username, secret).with_category(category);
            fields.website = website;
            fields.notes = notes;
            let entry = CredentialEntry::new(fields)?;
            core.vault.insert_or_replace(entry.clone())?;
            println!("{}", entry.id());
            if generated {
                println!("Generated secret: {}", entry.secret());
            }
        }
        Command::List {
            auth,
            category,
            json,
        } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let filter = category.map_or(EntryFilter::All, EntryFilter::Category);
            let entries = core.vault.subscribe(filter).current();
            if json {
                let rows: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "id": e.id(),
                            "title": e.title(),
                            "username": e.username(),
                            "website": e.website(),
                            "category": e.category(),
                            "updatedAt": e.updated_at(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for e in &entries {
                    println!(
                        "{}  {:<9} {} ({}) {}",
                        e.id(),
                        e.category(),
                        e.title(),
                        e.username(),
                        e.updated_at().format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Command::Categories { auth } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            for category in core.vault.list_distinct_categories()? {
                println!("{}", category);
            }
        }
        Command::Delete { auth, id } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let entry = core
                .vault
                .get_by_id(&id)?
                .with_context(|| format!("No entry with id {}", id))?;
            core.vault.delete(&entry)?;
            println!("Deleted {}", entry.title());
        }
        Command::ChangePin {
            auth,
            new_pin,
            confirm,
        } => {
            let core = open_core(args.data_dir)?;
            let gate = core.gate();
            let token = gate.reverify(SensitiveOperation::ChangePin, &auth.pin)?;
            gate.change_pin(token, &new_pin, &confirm)?;
            println!("PIN changed.");
        }
        Command::Export { auth, file } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let written = export_to_file(&core, &file)?;
            println!("Wrote {} bytes to {}", written, file.display());
        }
        Command::Import { auth, file } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let source = File::open(&file).with_context(|| format!("Failed to open {:?}", file))?;
            let restored = core.backup.read_backup(BufReader::new(source))?;
            println!("Restored {} entries", restored.len());
        }
        Command::Report { auth, reveal, json } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let token = if reveal {
                Some(core.gate().reverify(SensitiveOperation::RevealSecrets, &auth.pin)?)
            } else {
                None
            };
            let report = core.backup.report_snapshot(token.as_ref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Command::Settings {
            auth,
            biometric,
            auto_lock,
            auto_lock_minutes,
        } => {
            let core = open_core(args.data_dir)?;
            sign_in(&core, &auth.pin)?;
            let mut settings = core.settings()?;
            if biometric.is_some() || auto_lock.is_some() || auto_lock_minutes.is_some() {
                settings.biometric_enabled = biometric.unwrap_or(settings.biometric_enabled);
                settings.auto_lock_enabled = auto_lock.unwrap_or(settings.auto_lock_enabled);
                settings.auto_lock_minutes =
                    auto_lock_minutes.unwrap_or(settings.auto_lock_minutes);
                core.save_settings(&settings)?;
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use locknest_core::security::MemoryKeyStore;
    use locknest_core::storage::CoreConfig;

    #[test]
    fn test_failed_export_keeps_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let key_store = Arc::new(MemoryKeyStore::new());
        let core = LockNest::open(
            DataPaths::new(dir.path().join("data")),
            CoreConfig::default(),
            key_store.clone(),
        )
        .unwrap();
        let entry = CredentialEntry::new(EntryFields::new("Mail", "alice", "pw")).unwrap();
        core.vault.insert_or_replace(entry).unwrap();

        let backup = dir.path().join("vault.backup");
        let written = export_to_file(&core, &backup).unwrap();
        let previous = std::fs::read(&backup).unwrap();
        assert_eq!(previous.len(), written);

        key_store.set_available(false);
        assert!(export_to_file(&core, &backup).is_err());
        assert_eq!(std::fs::read(&backup).unwrap(), previous);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_generate_flags_disable_classes() {
        let args = Args::parse_from(["locknest", "generate", "--length", "8", "--no-special"]);
        match args.command {
            Command::Generate { options, count } => {
                let opts = options.to_options(&GeneratorOptions::default());
                assert_eq!(opts.length, 8);
                assert!(!opts.special);
                assert!(opts.uppercase);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_category_argument_parses() {
        let args = Args::parse_from([
            "locknest", "add", "--pin", "1234", "--title", "Bank", "--username", "me",
            "--category", "finance",
        ]);
        match args.command {
            Command::Add { category, .. } => assert_eq!(category, Category::Finance),
            other => panic!("unexpected {other:?}"),
        }
    }
}
