use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use cairn_server::{CairnServer, ServerConfig, StorageKind};
use cairn_store::{compression, RepositoryHandle, StoreError, WriteOutcome};
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo, ContentPrefix};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

/// Repository directory used when neither `--repo` nor a config names one.
pub const DEFAULT_REPO_DIR: &str = ".cairn";

/// Global options shared by every command.
struct Globals {
    format: OutputFormat,
    repo: Option<PathBuf>,
    config: Option<PathBuf>,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Globals {
        format: cli.format,
        repo: cli.repo,
        config: cli.config,
    };
    match cli.command {
        Command::Serve(args) => cmd_serve(&ctx, args).await,
        Command::Put(args) => cmd_put(&ctx, args).await,
        Command::Get(args) => cmd_get(&ctx, args).await,
        Command::Info(args) => cmd_info(&ctx, args).await,
        Command::Address(args) => cmd_address(&ctx, args),
        Command::Algorithms => cmd_algorithms(&ctx),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => Ok(ServerConfig::load(path)?),
        None => Ok(ServerConfig::default()),
    }
}

/// Config for commands that work on a local repository directory.
fn local_config(ctx: &Globals) -> anyhow::Result<ServerConfig> {
    let mut config = load_config(ctx.config.as_deref())?;
    if let Some(repo) = &ctx.repo {
        config.storage.kind = StorageKind::Filesystem;
        config.storage.path = Some(repo.clone());
    } else if config.storage.kind == StorageKind::Memory {
        config.storage.kind = StorageKind::Filesystem;
        config.storage.path = Some(PathBuf::from(DEFAULT_REPO_DIR));
    }
    Ok(config)
}

fn open_local(ctx: &Globals) -> anyhow::Result<RepositoryHandle> {
    let config = local_config(ctx)?;
    tracing::debug!(path = ?config.storage.path, "opening local repository");
    Ok(config.open_repository()?)
}

/// Accepts a registered algorithm name or a base-16 header value.
pub fn parse_compression(value: Option<&str>) -> anyhow::Result<CompressionHeaderId> {
    let Some(value) = value else {
        return Ok(CompressionHeaderId::NONE);
    };
    if let Some(compressor) = compression::by_name(value) {
        return Ok(compressor.header_id);
    }
    CompressionHeaderId::from_hex_str(value)
        .with_context(|| format!("unknown compression {value:?}; see `cairn algorithms`"))
}

pub fn parse_prefix(prefix: Option<char>) -> anyhow::Result<ContentPrefix> {
    match prefix {
        None => Ok(ContentPrefix::Data),
        Some(c) => Ok(ContentPrefix::from_char(c)?),
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin().lock().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn parse_id(raw: &str) -> anyhow::Result<ContentId> {
    raw.parse()
        .with_context(|| format!("invalid content id {raw:?}"))
}

async fn cmd_serve(ctx: &Globals, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(ctx.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    if let Some(repo) = &ctx.repo {
        config.storage.kind = StorageKind::Filesystem;
        config.storage.path = Some(repo.clone());
    }
    if args.read_only {
        config.repository.read_only = true;
    }

    let server = CairnServer::new(config)?;
    println!(
        "{} Cairn server on {} ({})",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        storage_label(server.config()),
    );
    server.serve().await?;
    Ok(())
}

fn storage_label(config: &ServerConfig) -> String {
    match (&config.storage.kind, &config.storage.path) {
        (StorageKind::Filesystem, Some(path)) => format!("filesystem: {}", path.display()),
        _ => "memory".to_string(),
    }
}

async fn cmd_put(ctx: &Globals, args: PutArgs) -> anyhow::Result<()> {
    let prefix = parse_prefix(args.encode.prefix)?;
    let header = parse_compression(args.encode.compression.as_deref())?;
    let payload = read_input(args.path.as_deref())?;

    let written = match open_local(ctx)? {
        RepositoryHandle::Direct(direct) => {
            direct
                .manager()
                .write_with_outcome(&payload, prefix, header)
                .await?
        }
        RepositoryHandle::Remote(_) => return Err(StoreError::NotWritable.into()),
    };

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "content_id": written.id,
                "deduplicated": written.outcome == WriteOutcome::Deduplicated,
                "length": payload.len(),
            })
        ),
        OutputFormat::Text => {
            let note = match written.outcome {
                WriteOutcome::Persisted => "stored".green(),
                WriteOutcome::Deduplicated => "already present".yellow(),
            };
            println!("{} ({note}, {} bytes)", written.id.to_string().cyan(), payload.len());
        }
    }
    Ok(())
}

async fn cmd_get(ctx: &Globals, args: GetArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let payload = open_local(ctx)?.get(&id).await?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &payload)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("{} wrote {} bytes to {}", "✓".green(), payload.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&payload)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn cmd_info(ctx: &Globals, args: InfoArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let info = open_local(ctx)?.info(&id).await?;
    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => print_info(&info),
    }
    Ok(())
}

fn print_info(info: &ContentInfo) {
    let compression = match compression::by_header_id(info.compression_header) {
        Some(c) => format!("{} ({})", c.name, info.compression_header),
        None if info.is_compressed() => info.compression_header.to_string(),
        None => "none".to_string(),
    };
    println!("{}", info.content_id.to_string().cyan().bold());
    println!("  Length:      {} bytes", info.original_length);
    println!("  Stored:      {} bytes", info.stored_length);
    println!("  Compression: {compression}");
    if let Some(location) = &info.location {
        println!("  Location:    {}", location.dimmed());
    }
}

fn cmd_address(ctx: &Globals, args: AddressArgs) -> anyhow::Result<()> {
    let prefix = parse_prefix(args.encode.prefix)?;
    let header = parse_compression(args.encode.compression.as_deref())?;
    compression::resolve(header)?;
    let payload = read_input(args.path.as_deref())?;

    let config = load_config(ctx.config.as_deref())?;
    let id = config.hasher()?.address(prefix, &payload, header);
    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "content_id": id,
                "policy": config.repository.addressing_policy.to_string(),
            })
        ),
        OutputFormat::Text => println!("{id}"),
    }
    Ok(())
}

fn cmd_algorithms(ctx: &Globals) -> anyhow::Result<()> {
    let algorithms = compression::algorithms();
    match ctx.format {
        OutputFormat::Json => {
            let list: Vec<_> = algorithms
                .iter()
                .map(|c| json!({ "name": c.name, "header": c.header_id.to_hex_string() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            for c in algorithms {
                println!("  {:<26} {}", c.name.bold(), c.header_id.to_string().dimmed());
            }
        }
    }
    Ok(())
}
