//! mdpress command line entry point.

mod convert;
mod watch;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    mdpress_browser::{EnsureOptions, EnvironmentCache},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "mdpress", version, about = "Convert Markdown to HTML, PDF, PNG, and JPEG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file path. Defaults to discovery in `./` and `~/.config/mdpress/`.
    #[arg(long, global = true, env = "MDPRESS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more markdown files.
    Convert {
        /// Markdown files to convert.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output types: html, pdf, png, jpeg. Defaults to export.types.
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Output directory override.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Download and cache the configured browser without converting anything.
    InstallBrowser,
    /// Watch for changes and convert markdown files when they are saved.
    Watch {
        /// File or directory to watch.
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output types: html, pdf, png, jpeg. Defaults to export.types.
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration.
    Show,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = match &cli.config {
        Some(path) => mdpress_config::load_config(path)?,
        None => mdpress_config::discover_and_load(),
    };

    match cli.command {
        Commands::Convert {
            files,
            types,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                config.export.output_directory = dir.display().to_string();
            }
            let types = convert::output_types(&config, &types)?;
            let cache = EnvironmentCache::new();
            for file in &files {
                let outputs = convert::convert_file(&config, &cache, file, &types).await?;
                for output in outputs {
                    println!("{}", output.display());
                }
            }
        },
        Commands::InstallBrowser => {
            let cache = EnvironmentCache::new();
            let environment = cache.ensure(&config, &EnsureOptions::default()).await?;
            if let Some(path) = environment.executable_path {
                info!(browser = environment.browser_name, "browser ready");
                println!("{}", path.display());
            }
        },
        Commands::Watch { dir, types } => {
            let types = convert::output_types(&config, &types)?;
            let cache = EnvironmentCache::new();
            watch::run(&config, &cache, &dir, &types).await?;
        },
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            print!("{}", toml::to_string_pretty(&config)?);
        },
    }

    Ok(())
}
