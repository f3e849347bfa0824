use clap::{Parser, Subcommand};
use schoolsite::cms::{ContentSource, StrapiClient};
use schoolsite::config::{self, SiteConfig};
use schoolsite::fetch::{self, SNAPSHOT_FILENAME, Snapshot};
use schoolsite::imaging::BlurParams;
use schoolsite::og::{self, ChromeScreenshotter, OgCache};
use schoolsite::process::{self, PROCESSED_FILENAME, ProcessedManifest};
use schoolsite::{generate, output, serve};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that process images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the placeholder cache and download every image again
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "schoolsite")]
#[command(about = "Static site builder and share image server for a Strapi-backed school website")]
#[command(long_about = "\
Static site builder and share image server for a Strapi-backed school website

Pages, navigation, site metadata, custom CSS and the 404 page are read from
Strapi and rendered to plain HTML:

  dist/
  ├── index.html            # page with slug \"/\"
  ├── about/index.html      # one directory per page slug
  ├── 404.html              # CMS-managed not-found page
  ├── sitemap.xml
  └── gallery.js            # slider dots and autocycle

'serve' serves dist/ and adds /api/og (page screenshots for link previews)
and a live /sitemap.xml.

Environment: STRAPI_URL, SITE_URL and FRONTEND_DOMAIN override config.toml;
RUST_LOG controls diagnostics.

Run 'schoolsite gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (snapshot, placeholders, cache)
    #[arg(long, default_value = ".schoolsite-temp", global = true)]
    temp_dir: PathBuf,

    /// More diagnostics (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch pages and site data from the CMS into a snapshot
    Fetch,
    /// Generate blur placeholders for every image in the snapshot
    Process(CacheArgs),
    /// Produce the final HTML site from the snapshot and placeholders
    Generate,
    /// Run the full pipeline: fetch → process → generate
    Build(CacheArgs),
    /// Validate config and check that the CMS answers
    Check,
    /// Render share images for every page into the OG cache
    Og,
    /// Serve the output directory with /api/og and /sitemap.xml
    Serve,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.config_dir)?;
    let client = StrapiClient::new(&site_config.cms)?;

    match &cli.command {
        Command::Fetch => {
            run_fetch(&cli, &client)?;
        }
        Command::Process(cache_args) => {
            let snapshot = Snapshot::load(&cli.temp_dir.join(SNAPSHOT_FILENAME))?;
            run_process(&cli, &site_config, &client, &snapshot, cache_args)?;
        }
        Command::Generate => {
            let snapshot = Snapshot::load(&cli.temp_dir.join(SNAPSHOT_FILENAME))?;
            let processed = load_processed(&cli.temp_dir)?;
            run_generate(&cli, &site_config, &snapshot, &processed)?;
        }
        Command::Build(cache_args) => {
            std::fs::create_dir_all(&cli.temp_dir)?;

            println!("==> Stage 1: Fetching from {}", client.base_url());
            let snapshot = run_fetch(&cli, &client)?;

            println!("==> Stage 2: Processing images");
            let processed = run_process(&cli, &site_config, &client, &snapshot, cache_args)?;

            println!("==> Stage 3: Generating HTML \u{2192} {}", cli.output.display());
            run_generate(&cli, &site_config, &snapshot, &processed)?;

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", client.base_url());
            let slugs = client.fetch_all_slugs_with_dates()?;
            output::print_check_output(&site_config, &slugs);
            println!("==> Config and CMS are OK");
        }
        Command::Og => {
            let cache = OgCache::new(
                &site_config,
                &cli.config_dir,
                Box::new(ChromeScreenshotter::new(&site_config.og)),
            );
            println!("==> Rendering share images into {}", cache.dir().display());
            let pages = og_pages(&client)?;
            let report = og::prefetch(&cache, &pages);
            output::print_og_summary(&report);
        }
        Command::Serve => {
            let cache = OgCache::new(
                &site_config,
                &cli.config_dir,
                Box::new(ChromeScreenshotter::new(&site_config.og)),
            );
            let state = Arc::new(serve::AppState::new(
                &site_config,
                cli.output.clone(),
                Arc::new(client),
                Arc::new(cache),
            ));
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            println!("==> Serving {} on http://{}", cli.output.display(), site_config.serve.bind);
            runtime.block_on(serve::serve(&site_config.serve.bind, state))?;
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn run_fetch(cli: &Cli, client: &StrapiClient) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let snapshot = fetch::fetch(client)?;
    snapshot.save(&cli.temp_dir.join(SNAPSHOT_FILENAME))?;
    output::print_fetch_output(&snapshot);
    Ok(snapshot)
}

fn run_process(
    cli: &Cli,
    site_config: &SiteConfig,
    client: &StrapiClient,
    snapshot: &Snapshot,
    cache_args: &CacheArgs,
) -> Result<ProcessedManifest, Box<dyn std::error::Error>> {
    init_thread_pool(&site_config.processing);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process(
        client,
        snapshot,
        &site_config.cms,
        &BlurParams::from_config(&site_config.images),
        &cli.temp_dir,
        !cache_args.no_cache,
        Some(tx),
    )?;
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    result
        .manifest
        .save(&cli.temp_dir.join(PROCESSED_FILENAME))?;
    println!("Cache: {}", result.cache_stats);
    Ok(result.manifest)
}

fn run_generate(
    cli: &Cli,
    site_config: &SiteConfig,
    snapshot: &Snapshot,
    processed: &ProcessedManifest,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = generate::generate(
        snapshot,
        processed,
        site_config,
        &cli.output,
        chrono::Utc::now(),
    )?;
    output::print_generate_output(&result);
    Ok(())
}

/// Placeholders from the process stage; pages still render without them.
fn load_processed(temp_dir: &Path) -> Result<ProcessedManifest, Box<dyn std::error::Error>> {
    let path = temp_dir.join(PROCESSED_FILENAME);
    if !path.exists() {
        warn!("{} not found, rendering without placeholders", path.display());
        return Ok(ProcessedManifest::default());
    }
    Ok(ProcessedManifest::load(&path)?)
}

/// Every page path with its update time, home first.
fn og_pages(client: &StrapiClient) -> Result<Vec<(String, Option<String>)>, Box<dyn std::error::Error>> {
    let home_updated = client
        .fetch_slug_entry(fetch::HOME_SLUG)
        .map(|entry| entry.and_then(|e| e.updated_at))
        .unwrap_or_else(|err| {
            warn!("home page lookup failed: {err}");
            None
        });
    let mut pages = vec![("/".to_string(), home_updated)];
    for entry in client.fetch_all_slugs_with_dates()? {
        pages.push((schoolsite::cms::page_path(&entry.slug), entry.updated_at));
    }
    Ok(pages)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
