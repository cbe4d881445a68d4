//! Public Disk CLI - resolve public resources and fetch files through the local cache

use anyhow::{anyhow, Context, Result};
use std::env;
use tracing::error;
use tracing_subscriber::EnvFilter;

use public_disk_access::{
    AccessConfig, CacheOutcome, CachedFile, DownloadCache, PublicDiskClient, PublicKey,
    STALE_PARTIAL_AGE,
};

/// CLI command
#[derive(Debug)]
enum Command {
    /// List the files of a public resource
    List { public_key: String },
    /// Fetch a file URL through the cache
    Fetch { url: String, filename: String },
    /// Resolve a public resource and fetch one of its files by name
    Get { public_key: String, name: String },
    /// Remove stale partial downloads
    Clean,
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"Public Disk - browse public disk resources and cache their files locally

USAGE:
    public-disk list <public_key>
    public-disk fetch <url> <filename>
    public-disk get <public_key> <name>
    public-disk clean
    public-disk help

COMMANDS:
    list    Print the files of a public resource
    fetch   Download a file URL into the cache (served locally if already cached)
    get     Resolve a public resource and fetch the file called <name>
    clean   Remove partial downloads untouched for an hour (interrupted runs)
    help    Show this help message

ENVIRONMENT:
    PUBLIC_DISK_LISTING_URL     Listing endpoint
    PUBLIC_DISK_CACHE_DIR       Cache root directory
    PUBLIC_DISK_TIMEOUT_SECS    Per-request timeout (default: none)
    PUBLIC_DISK_LISTING_LIMIT   Listing page size
    RUST_LOG                    Log filter (trace, debug, info, warn, error)

A .env file in the working directory is loaded first if present.
"#
    );
}

fn parse_args(args: &[String]) -> Result<Command> {
    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "list" => {
            let [_, _, public_key] = args else {
                return Err(anyhow!("Usage: public-disk list <public_key>"));
            };
            Ok(Command::List {
                public_key: public_key.clone(),
            })
        }
        "fetch" => {
            let [_, _, url, filename] = args else {
                return Err(anyhow!("Usage: public-disk fetch <url> <filename>"));
            };
            Ok(Command::Fetch {
                url: url.clone(),
                filename: filename.clone(),
            })
        }
        "get" => {
            let [_, _, public_key, name] = args else {
                return Err(anyhow!("Usage: public-disk get <public_key> <name>"));
            };
            Ok(Command::Get {
                public_key: public_key.clone(),
                name: name.clone(),
            })
        }
        "clean" => Ok(Command::Clean),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => {
            eprintln!("Unknown command: {}", other);
            Ok(Command::Help)
        }
    }
}

fn print_cached(cached: &CachedFile) {
    let source = match cached.outcome() {
        CacheOutcome::Hit => "cache hit",
        CacheOutcome::Miss => "downloaded",
    };
    println!(
        "{} ({} bytes, {})",
        cached.path().display(),
        cached.size(),
        source
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment may come from a .env file
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if let Command::Help = command {
        print_help();
        return Ok(());
    }

    let config = AccessConfig::from_env().context("Failed to load configuration")?;
    let client = PublicDiskClient::new(&config)?;

    match command {
        Command::List { public_key } => {
            let key = PublicKey::new(public_key)?;
            let entries = client.resolve(&key).await.inspect_err(|e| {
                error!(error = %e, "Failed to resolve public resource");
            })?;

            if entries.is_empty() {
                println!("No files found.");
            } else {
                for entry in entries {
                    let size = entry
                        .size_bytes
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let kind = if entry.is_dir() { "dir" } else { "file" };
                    println!("  {:<4} {:>12}  {}", kind, size, entry.name);
                }
            }
        }
        Command::Fetch { url, filename } => {
            let cache = DownloadCache::from_config(&config, client);
            let cached = cache.fetch(&url, &filename).await.inspect_err(|e| {
                error!(error = %e, file = %filename, "Fetch failed");
            })?;
            print_cached(&cached);
        }
        Command::Get { public_key, name } => {
            let key = PublicKey::new(public_key)?;
            let entries = client.resolve(&key).await?;
            let entry = entries
                .into_iter()
                .find(|e| e.name == name)
                .ok_or_else(|| anyhow!("No file named '{}' in resource {}", name, key))?;
            if !entry.is_downloadable() {
                return Err(anyhow!("'{}' has no download URL", name));
            }

            let cache = DownloadCache::from_config(&config, client);
            let cached = cache.fetch(&entry.download_url, &entry.name).await?;
            print_cached(&cached);
        }
        Command::Clean => {
            let cache = DownloadCache::from_config(&config, client);
            let removed = cache.cleanup(STALE_PARTIAL_AGE).await.inspect_err(|e| {
                error!(error = %e, "Failed to clean cache");
            })?;
            println!(
                "Removed {} stale partial file(s) from {}",
                removed,
                cache.cache_root().display()
            );
        }
        Command::Help => print_help(),
    }

    Ok(())
}
