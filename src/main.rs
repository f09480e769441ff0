use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;

use shelfmark::UrlCache;
use shelfmark::resolver::{MetricsSnapshot, Resolver, ResolverConfig};
use shelfmark::storage::{BackendConfig, ListOptions, S3Backend, SortBy, StorageBackend};

/// Find files in object storage from an imprecise path
#[derive(Parser)]
#[command(name = "shelfmark", version, about)]
struct Cli {
    /// Custom S3-compatible endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Region override
    #[arg(long, global = true)]
    region: Option<String>,

    /// Use path-style addressing (most non-AWS endpoints need this)
    #[arg(long, global = true)]
    path_style: bool,

    /// Skip credentials for anonymous access to public buckets
    #[arg(long, global = true)]
    anonymous: bool,

    /// Public base URL for object links, e.g. a CDN root
    #[arg(long, global = true)]
    public_url: Option<String>,

    /// Seconds a resolved URL stays cached (default 3600)
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,

    /// Print resolver metrics after the command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank files across buckets against a fuzzy path
    Search {
        /// Path fragment, e.g. docs/setup-guide
        path: String,

        /// Emit the full candidate list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve the best match and print its public URL
    Url {
        /// Path fragment, e.g. docs/setup-guide
        path: String,
    },
    /// List buckets
    Buckets,
    /// List one folder level of a bucket
    Ls {
        bucket: String,
        folder: Option<String>,

        /// Long format with sizes and modification times
        #[arg(short, long)]
        long: bool,

        /// List names in descending order (reverses the fetched page)
        #[arg(short, long)]
        reverse: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = BackendConfig::from_env();
    if cli.endpoint.is_some() {
        config.endpoint_url = cli.endpoint.clone();
    }
    if cli.region.is_some() {
        config.region = cli.region.clone();
    }
    if cli.path_style {
        config.force_path_style = true;
    }
    if cli.anonymous {
        config.anonymous = true;
    }
    if cli.public_url.is_some() {
        config.public_base_url = cli.public_url.clone();
    }

    let backend: Arc<dyn StorageBackend> = match S3Backend::connect(config).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!(
                "{} failed to initialize storage backend: {}",
                "Error:".red().bold(),
                e
            );
            eprintln!("Check your credentials, or pass --anonymous for public buckets.");
            std::process::exit(1);
        }
    };

    let ttl = cli
        .cache_ttl
        .or_else(|| env_seconds("SHELFMARK_CACHE_TTL"))
        .unwrap_or(3600);
    let cache = UrlCache::new(1024, Duration::from_secs(ttl), Duration::from_secs(30));
    let resolver = Resolver::new(Arc::clone(&backend), cache, ResolverConfig::from_env());

    let outcome = run(&cli.command, &resolver, backend.as_ref()).await;

    if cli.verbose {
        print_metrics(resolver.metrics().snapshot());
    }

    if let Err(e) = outcome {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: &Command,
    resolver: &Resolver,
    backend: &dyn StorageBackend,
) -> anyhow::Result<()> {
    match command {
        Command::Search { path, json } => search(resolver, path, *json).await,
        Command::Url { path } => url(resolver, path).await,
        Command::Buckets => buckets(backend).await,
        Command::Ls {
            bucket,
            folder,
            long,
            reverse,
        } => {
            ls(
                backend,
                bucket,
                folder.as_deref().unwrap_or(""),
                *long,
                *reverse,
            )
            .await
        }
    }
}

/// Split a user path into components the way a routing layer would.
fn components_of(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

async fn search(resolver: &Resolver, path: &str, json: bool) -> anyhow::Result<()> {
    let found = resolver.resolve(&components_of(path)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("No files matched '{path}'");
        return Ok(());
    }

    println!("{:>7}  {:<40} {:<18} URL", "SCORE", "PATH", "TYPE");
    println!("{}", "-".repeat(100));
    for candidate in &found {
        println!(
            "{:>7.1}  {:<40} {:<18} {}",
            candidate.score,
            candidate.path.blue().bold(),
            candidate.extension,
            candidate.url.dimmed()
        );
    }
    Ok(())
}

async fn url(resolver: &Resolver, path: &str) -> anyhow::Result<()> {
    let best = resolver.resolve_best(&components_of(path)).await?;
    let url = resolver.resolve_url(&best).await?;

    eprintln!(
        "{} (score {:.1})",
        best.path.blue().bold(),
        best.score
    );
    println!("{url}");
    Ok(())
}

async fn buckets(backend: &dyn StorageBackend) -> anyhow::Result<()> {
    let buckets = backend.list_buckets().await?;

    for bucket in buckets {
        match bucket.created_at {
            Some(created) => println!("{:<40} {}", bucket.name.blue().bold(), created.dimmed()),
            None => println!("{}", bucket.name.blue().bold()),
        }
    }
    Ok(())
}

async fn ls(
    backend: &dyn StorageBackend,
    bucket: &str,
    folder: &str,
    long: bool,
    reverse: bool,
) -> anyhow::Result<()> {
    let options = ListOptions {
        sort: if reverse {
            SortBy::NameDesc
        } else {
            SortBy::NameAsc
        },
        ..Default::default()
    };
    let listing = backend.list_objects(bucket, folder, options).await?;

    if long {
        println!("{:<50} {:>12} MODIFIED", "NAME", "SIZE");
        println!("{}", "-".repeat(80));
        for prefix in &listing.prefixes {
            println!("{:<50} {:>12} -", prefix.blue().bold(), "-");
        }
        for object in &listing.objects {
            println!(
                "{:<50} {:>12} {}",
                object.name,
                humansize::format_size(object.size, humansize::BINARY),
                object.last_modified.as_deref().unwrap_or("-")
            );
        }
    } else {
        for prefix in &listing.prefixes {
            println!("{}", prefix.blue().bold());
        }
        for object in &listing.objects {
            println!("{}", object.name);
        }
    }
    Ok(())
}

fn env_seconds(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn print_metrics(snapshot: MetricsSnapshot) {
    eprintln!();
    eprintln!("{}", "resolver metrics".dimmed());
    eprintln!("  searches:        {}", snapshot.searches);
    eprintln!("  direct hits:     {}", snapshot.direct_hits);
    eprintln!("  fallback scans:  {}", snapshot.fallback_scans);
    eprintln!("  listings issued: {}", snapshot.listings);
    eprintln!(
        "  cache hit/miss:  {}/{}",
        snapshot.cache_hits, snapshot.cache_misses
    );
    eprintln!("  failures:        {}", snapshot.failures);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reverse_help_names_page_scope() {
        // Descending order is applied to the single fetched page, and
        // the flag's help has to say so.
        let cmd = Cli::command();
        let ls = cmd.find_subcommand("ls").unwrap();
        let reverse = ls
            .get_arguments()
            .find(|arg| arg.get_id().as_str() == "reverse")
            .unwrap();
        let help = reverse.get_help().unwrap().to_string();
        assert!(help.contains("fetched page"));
    }
}
