//! reco: encrypted personal file storage
//!
//! Account:
//!   init                 - create the account (passphrase-protected master key)
//!   setup-cloud s3|fs    - verify and save cloud storage settings
//!   status               - show account and cloud state
//!
//! Records:
//!   add / note           - store a file or a note
//!   list / show / get    - browse, inspect, download
//!   edit / tag / rm / restore
//!   box / unbox / boxes / tags
//!
//! Every command that touches records needs the passphrase, read from
//! RECO_PASSPHRASE or prompted for.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reco_core::config::{expand_tilde, RecoConfig};
use reco_core::{Reco, RecoError, RecoType};
use reco_crypto::{sha256_hex, SecretString};
use reco_engine::{
    BoxChange, BoxTarget, CloudSettings, Engine, EngineState, OrderBy, RecoQuery, RecoUpdate,
};
use tracing::warn;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "reco", version, about = "Encrypted personal file storage")]
struct Cli {
    /// Path to reco.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "RECO_CONFIG",
        default_value = "~/.config/reco/reco.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "RECO_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "RECO_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show account and cloud state
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create the account
    Init,

    /// Verify and save cloud storage settings
    #[command(name = "setup-cloud")]
    SetupCloud {
        #[command(subcommand)]
        provider: Provider,
    },

    /// Store a file
    Add {
        file: PathBuf,
        /// Tag (repeatable)
        #[arg(long, short = 't')]
        tag: Vec<String>,
        #[arg(long, short = 'm', default_value = "")]
        message: String,
        /// Put the file into the box with this title (created if missing)
        #[arg(long, short = 'b')]
        r#box: Option<String>,
    },

    /// Store a note
    Note {
        message: String,
        /// Link (repeatable)
        #[arg(long, short = 'l')]
        link: Vec<String>,
        #[arg(long, short = 't')]
        tag: Vec<String>,
    },

    /// List recos
    List {
        /// Only soft-deleted recos
        #[arg(long)]
        deleted: bool,
        #[arg(long, short = 't')]
        tag: Option<String>,
        #[arg(long, value_enum)]
        kind: Option<Kind>,
        #[arg(long, value_enum, default_value = "updated")]
        sort: SortKey,
        /// Newest / largest first
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Replace a reco's tags
    Tag { id: String, tags: Vec<String> },

    /// Print a reco as JSON (counts as an access)
    Show { id: String },

    /// Download and decrypt a file reco
    Get {
        id: String,
        /// Destination (default: the reco's file name in the current directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Edit a reco
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short = 'm')]
        message: Option<String>,
        /// Replace all links (repeatable)
        #[arg(long, short = 'l')]
        link: Vec<String>,
        /// Replace the file content
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Soft-delete a reco
    Rm { id: String },

    /// Undo a soft delete
    Restore { id: String },

    /// Move a reco into a box (by title, created if missing)
    Box { id: String, title: String },

    /// Take a reco out of its box
    Unbox { id: String },

    /// List boxes, or the recos in one box
    Boxes { id: Option<String> },

    /// List tags
    Tags {
        /// Remove tags no reco uses
        #[arg(long)]
        prune: bool,
    },

    /// Generate (if needed) and print the thumbnail path of an image reco
    Thumb { id: String },

    /// Upload an encrypted copy of the metadata store
    Backup,

    /// Check whether a file's content is already stored
    Checksum { file: PathBuf },

    /// Delete the account's bootstrap record (dangerous)
    #[command(name = "delete-account")]
    DeleteAccount {
        #[arg(long)]
        yes_i_am_sure: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Subcommand, Debug)]
enum Provider {
    /// Any S3-compatible object store
    S3 {
        #[arg(long)]
        endpoint: String,
        #[arg(long, default_value = "us-east-1")]
        region: String,
        #[arg(long)]
        bucket: String,
        #[arg(long, env = "AWS_ACCESS_KEY_ID")]
        access_key_id: String,
        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        secret_access_key: String,
    },
    /// A local directory (e.g. a NAS mount)
    Fs { root: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    File,
    Note,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortKey {
    Updated,
    Created,
    Accessed,
    Count,
    Name,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);

    let (config, found) = match load_config(&config_path).await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error[config]: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    if !found {
        warn!("config file not found: {}  (using defaults)", config_path.display());
    }

    match run(cli.command, &config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e
                .downcast_ref::<RecoError>()
                .map(|re| re.kind().as_str())
                .unwrap_or("internal");
            eprintln!("error[{kind}]: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &RecoConfig, config_path: &Path) -> Result<()> {
    if let Commands::Config { action: ConfigAction::Show } = command {
        return cmd_config_show(config, config_path);
    }

    let engine = Engine::open(config)?;
    match command {
        Commands::Config { .. } => unreachable!("handled above"),
        Commands::Status => cmd_status(&engine, config).await,
        Commands::Init => cmd_init(&engine).await,
        other => {
            unlock(&engine).await?;
            run_unlocked(&engine, other).await
        }
    }
}

async fn run_unlocked(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::SetupCloud { provider } => cmd_setup_cloud(engine, provider).await,
        Commands::Add {
            file,
            tag,
            message,
            r#box,
        } => cmd_add(engine, &file, tag, message, r#box).await,
        Commands::Note { message, link, tag } => {
            let mut reco = Reco::new_note(&message, link)?;
            reco.set_tags(tag);
            let reco = engine.insert_reco(reco, None).await?;
            println!("{}", reco.id);
            Ok(())
        }
        Commands::List {
            deleted,
            tag,
            kind,
            sort,
            desc,
            limit,
        } => cmd_list(engine, deleted, tag, kind, sort, desc, limit).await,
        Commands::Tag { id, tags } => {
            let mut reco = engine.get_reco(&id).await?;
            reco.set_tags(tags);
            report_update(engine.update_reco(reco, None).await?);
            Ok(())
        }
        Commands::Show { id } => {
            let reco = engine.access_reco(&id).await?;
            println!("{}", serde_json::to_string_pretty(&reco)?);
            Ok(())
        }
        Commands::Get { id, out } => {
            let reco = engine.get_reco(&id).await?;
            let dest = out.unwrap_or_else(|| PathBuf::from(&reco.file_name));
            engine.download_decrypt(&reco.blob_name(), &dest).await?;
            println!("{}", dest.display());
            Ok(())
        }
        Commands::Edit {
            id,
            name,
            message,
            link,
            content,
        } => cmd_edit(engine, &id, name, message, link, content).await,
        Commands::Rm { id } => Ok(engine.delete_reco(&id).await?),
        Commands::Restore { id } => {
            engine.restore_reco(&id).await?;
            Ok(())
        }
        Commands::Box { id, title } => {
            match engine.change_box(&id, BoxTarget::Title(title)).await? {
                BoxChange::NoChange => println!("already in that box"),
                BoxChange::Moved { to, .. } => println!("moved to box {to}"),
            }
            Ok(())
        }
        Commands::Unbox { id } => {
            match engine.leave_box(&id).await? {
                Some(from) => println!("left box {from}"),
                None => println!("not in a box"),
            }
            Ok(())
        }
        Commands::Boxes { id: Some(box_id) } => {
            print_recos(&engine.recos_in_box(&box_id).await?);
            Ok(())
        }
        Commands::Boxes { id: None } => {
            for b in engine.list_boxes().await? {
                println!("{}  {:>4}  {}", b.id, b.reco_ids.len(), b.title);
            }
            Ok(())
        }
        Commands::Tags { prune } => {
            if prune {
                let n = engine.prune_tags().await?;
                println!("pruned {n} unused tags");
            }
            for tag in engine.list_tags().await? {
                println!("{:>4}  {}", tag.reco_ids.len(), tag.name);
            }
            Ok(())
        }
        Commands::Thumb { id } => {
            println!("{}", engine.thumbnail(&id).await?.display());
            Ok(())
        }
        Commands::Backup => {
            let name = engine.backup_database().await?;
            println!("uploaded {name}");
            Ok(())
        }
        Commands::Checksum { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let sum = sha256_hex(&data);
            let exists = engine.checksum_exists(&sum).await?;
            println!("{sum}  {}", if exists { "stored" } else { "new" });
            Ok(())
        }
        Commands::DeleteAccount { yes_i_am_sure } => {
            if !yes_i_am_sure {
                return Err(RecoError::InvalidInput(
                    "refusing to delete the account without --yes-i-am-sure".into(),
                )
                .into());
            }
            engine.delete_account().await?;
            println!("account deleted");
            Ok(())
        }
        Commands::Status | Commands::Init | Commands::Config { .. } => {
            unreachable!("handled before unlocking")
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Returns the config and whether the file existed.
async fn load_config(path: &Path) -> Result<(RecoConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((RecoConfig::default(), false))
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Passphrase ────────────────────────────────────────────────────────────────

fn read_passphrase(prompt: &str) -> Result<SecretString> {
    if let Ok(p) = std::env::var("RECO_PASSPHRASE") {
        return Ok(SecretString::from(p));
    }
    let p = rpassword::prompt_password(prompt).context("reading passphrase")?;
    Ok(SecretString::from(p))
}

async fn unlock(engine: &Engine) -> Result<()> {
    if !engine.account_exists().await {
        return Err(RecoError::NotFound("account (run `reco init` first)".into()).into());
    }
    engine.login(read_passphrase("passphrase: ")?).await?;
    Ok(())
}

// ── `reco status` / `reco config show` / `reco init` ─────────────────────────

async fn cmd_status(engine: &Engine, config: &RecoConfig) -> Result<()> {
    let state = engine.state().await;
    println!("reco v{}", env!("CARGO_PKG_VERSION"));
    println!("  data dir:  {}", config.paths.data_dir().display());
    println!(
        "  account:   {}",
        if state == EngineState::Uninitialized {
            "not created (run `reco init`)"
        } else {
            "exists"
        }
    );
    println!(
        "  cloud:     {}",
        if engine.cloud_configured() {
            "configured"
        } else {
            "not configured (run `reco setup-cloud`)"
        }
    );
    Ok(())
}

fn cmd_config_show(config: &RecoConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

async fn cmd_init(engine: &Engine) -> Result<()> {
    let passphrase = if std::env::var("RECO_PASSPHRASE").is_ok() {
        read_passphrase("")?
    } else {
        use reco_crypto::ExposeSecret;
        let first = read_passphrase("new passphrase: ")?;
        let again = read_passphrase("repeat passphrase: ")?;
        if first.expose_secret() != again.expose_secret() {
            return Err(RecoError::InvalidInput("passphrases do not match".into()).into());
        }
        first
    };
    engine.create_account(passphrase).await?;
    println!("account created");
    Ok(())
}

// ── Record commands ───────────────────────────────────────────────────────────

async fn cmd_setup_cloud(engine: &Engine, provider: Provider) -> Result<()> {
    let settings = match provider {
        Provider::S3 {
            endpoint,
            region,
            bucket,
            access_key_id,
            secret_access_key,
        } => CloudSettings::S3 {
            endpoint,
            region,
            bucket,
            access_key_id,
            secret_access_key,
        },
        Provider::Fs { root } => CloudSettings::Fs {
            root: expand_tilde(&root).to_string_lossy().into_owned(),
        },
    };
    engine.setup_cloud(settings).await?;
    println!("cloud storage configured");
    Ok(())
}

async fn cmd_add(
    engine: &Engine,
    file: &Path,
    tags: Vec<String>,
    message: String,
    box_title: Option<String>,
) -> Result<()> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let mut reco = Reco::new_file(&name)?;
    reco.set_tags(tags);
    reco.message = message;
    let reco = match box_title {
        Some(title) => {
            engine
                .insert_reco_into_box(reco, Some(data), BoxTarget::Title(title))
                .await?
        }
        None => engine.insert_reco(reco, Some(data)).await?,
    };
    println!("{}", reco.id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_list(
    engine: &Engine,
    deleted: bool,
    tag: Option<String>,
    kind: Option<Kind>,
    sort: SortKey,
    desc: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut query = RecoQuery::new().order_by(match sort {
        SortKey::Updated => OrderBy::UpdatedAt,
        SortKey::Created => OrderBy::CreatedAt,
        SortKey::Accessed => OrderBy::AccessedAt,
        SortKey::Count => OrderBy::AccessCount,
        SortKey::Name => OrderBy::FileName,
    });
    if deleted {
        query = query.deleted();
    }
    if let Some(tag) = tag {
        query = query.tagged(tag);
    }
    if let Some(kind) = kind {
        query = query.of_type(match kind {
            Kind::File => RecoType::File,
            Kind::Note => RecoType::Other,
        });
    }
    if desc {
        query = query.desc();
    }
    if let Some(n) = limit {
        query = query.limit(n);
    }
    print_recos(&engine.list_recos(&query).await?);
    Ok(())
}

async fn cmd_edit(
    engine: &Engine,
    id: &str,
    name: Option<String>,
    message: Option<String>,
    links: Vec<String>,
    content: Option<PathBuf>,
) -> Result<()> {
    let mut reco = engine.get_reco(id).await?;
    if let Some(name) = name {
        reco.set_file_name(&name)?;
    }
    if let Some(message) = message {
        reco.message = message;
    }
    if !links.is_empty() {
        reco.links = links;
    }
    let blob = match content {
        Some(path) => Some(
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };
    report_update(engine.update_reco(reco, blob).await?);
    Ok(())
}

fn report_update(update: RecoUpdate) {
    match update {
        RecoUpdate::Updated(reco) => println!("updated {}", reco.id),
        RecoUpdate::NoChange => println!("no change"),
    }
}

fn print_recos(recos: &[Reco]) {
    for r in recos {
        let title = match r.reco_type {
            RecoType::File => r.file_name.as_str(),
            _ => r.message.lines().next().unwrap_or_default(),
        };
        let tags = if r.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", r.tags.join(", "))
        };
        println!("{}  {}  {title}{tags}", r.id, &r.updated_at[..r.updated_at.len().min(10)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_accepts_repeated_tags_and_box() {
        let cli = Cli::try_parse_from([
            "reco", "add", "photo.png", "-t", "trip", "-t", "2024", "--box", "Holidays",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { file, tag, r#box, .. } => {
                assert_eq!(file, PathBuf::from("photo.png"));
                assert_eq!(tag, vec!["trip", "2024"]);
                assert_eq!(r#box.as_deref(), Some("Holidays"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_sort_key_parses() {
        let cli = Cli::try_parse_from(["reco", "list", "--sort", "count", "--desc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                sort: SortKey::Count,
                desc: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_config_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (config, found) = load_config(&tmp.path().join("none.toml")).await.unwrap();
        assert!(!found);
        assert_eq!(config.paths.db_file, PathBuf::from("reco.db"));
    }

    #[tokio::test]
    async fn invalid_config_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("reco.toml");
        std::fs::write(&path, "[log\nlevel = ").unwrap();
        assert!(load_config(&path).await.is_err());
    }
}
