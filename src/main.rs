use clap::{Parser, Subcommand};
use routerino_forge::cache::FsCache;
use routerino_forge::compose::compose;
use routerino_forge::config::{self, BuildConfig, ImageTool};
use routerino_forge::emit::BuildSession;
use routerino_forge::imaging::{ImageProcessor, MagickProcessor, RustProcessor};
use routerino_forge::{output, routes};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn version_string() -> &'static str {
    let on_tag = env!("FORGE_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FORGE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "routerino-forge")]
#[command(about = "Pre-render client-routed sites to static HTML")]
#[command(long_about = "\
Pre-render client-routed sites to static HTML

Every static route in the route table is rendered into the app's HTML
template with title, canonical, Open Graph and Twitter tags. Routes with
parameter segments (/blog/:slug) are left to the client router.

Output layout:

  dist/
  ├── index.html          # /
  ├── about.html          # /about (flat form)
  ├── about/index.html    # /about (directory form)
  ├── 404.html            # not-found page, noindex
  ├── sitemap.xml         # static routes at their canonical URLs
  └── robots.txt          # only if you did not ship one

Configuration is read from forge.toml; flags override the file.
Run 'routerino-forge gen-config' to generate a documented forge.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: forge.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Route table (.json array or .toml with [[routes]])
    #[arg(long, global = true)]
    routes: Option<PathBuf>,

    /// HTML template containing the root-mount element
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Site origin for canonical URLs and the sitemap
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Canonical URLs end with "/"
    #[arg(long, global = true)]
    trailing_slash: bool,

    /// Skip sitemap.xml and robots.txt
    #[arg(long, global = true)]
    no_sitemap: bool,

    /// Generate blurred image placeholders
    #[arg(long, global = true, conflicts_with = "no_optimize_images")]
    optimize_images: bool,

    /// Disable image placeholders even if the config enables them
    #[arg(long, global = true)]
    no_optimize_images: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every static route and write the site
    Build,
    /// Load config, routes and template, and report without writing
    Check,
    /// Print a stock forge.toml with all options documented
    GenConfig,
}

impl Cli {
    /// Flags as a sparse TOML layer over the config file.
    fn overrides(&self) -> toml::Value {
        let mut table = toml::Table::new();
        let path = |p: &PathBuf| toml::Value::String(p.to_string_lossy().into_owned());

        if let Some(p) = &self.routes {
            table.insert("routes".into(), path(p));
        }
        if let Some(p) = &self.template {
            table.insert("template".into(), path(p));
        }
        if let Some(p) = &self.output_dir {
            table.insert("output_dir".into(), path(p));
        }
        if let Some(url) = &self.base_url {
            table.insert("base_url".into(), toml::Value::String(url.clone()));
        }
        if self.trailing_slash {
            table.insert("use_trailing_slash".into(), toml::Value::Boolean(true));
        }
        if self.no_sitemap {
            table.insert("generate_sitemap".into(), toml::Value::Boolean(false));
        }
        if self.verbose {
            table.insert("verbose".into(), toml::Value::Boolean(true));
        }
        if self.optimize_images || self.no_optimize_images {
            let mut images = toml::Table::new();
            images.insert(
                "enabled".into(),
                toml::Value::Boolean(self.optimize_images),
            );
            table.insert("optimize_images".into(), toml::Value::Table(images));
        }
        toml::Value::Table(table)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Build => {
            let config = load(&cli)?;
            init_thread_pool(&config.processing);
            let routes = routes::load_routes(&config.routes)?;
            let processor = build_processor(&config);
            let cache = FsCache::new(config.image_config().cache_dir);

            info!(
                routes = %config.routes.display(),
                template = %config.template.display(),
                "==> Building {}",
                config.output_dir.display()
            );
            let stats = BuildSession::new(&config, processor.as_ref(), &cache).emit(&routes)?;
            output::print_build_summary(&stats);
        }
        Command::Check => {
            let config = load(&cli)?;
            let routes = routes::load_routes(&config.routes)?;
            let template = std::fs::read_to_string(&config.template).map_err(|e| {
                format!("Failed to read template {}: {}", config.template.display(), e)
            })?;
            output::print_check_output(&routes);
            for warning in compose(&template, "", &[], None).warnings {
                warn!(template = %config.template.display(), "{}", warning);
            }
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the layered config and start logging at its verbosity.
fn load(cli: &Cli) -> Result<BuildConfig, config::ConfigError> {
    let config = config::load_config(cli.config.as_deref(), cli.overrides())?;
    init_logging(config.verbose);
    Ok(config)
}

/// Install the `tracing` subscriber. `RUST_LOG` wins over `verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "routerino_forge=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_target(false))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Pick the placeholder backend. A missing ImageMagick falls back to the
/// built-in processor so the build still completes.
fn build_processor(config: &BuildConfig) -> Box<dyn ImageProcessor> {
    match config.image_tool {
        ImageTool::Builtin => Box::new(RustProcessor::new()),
        ImageTool::Magick => {
            match MagickProcessor::detect(Duration::from_secs(config.image_timeout_secs)) {
                Some(magick) => Box::new(magick),
                None => {
                    warn!("ImageMagick not found on PATH; using the built-in processor");
                    Box::new(RustProcessor::new())
                }
            }
        }
    }
}
