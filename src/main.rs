//! xcf-forge CLI
//!
//! Entry point for the `xcf-forge` command-line tool.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use xcf_forge::cache::open_store;
use xcf_forge::cancel::{install_signal_handler, CancelToken};
use xcf_forge::config::{parse_cache_policy, RunConfig};
use xcf_forge::executor::XcodebuildExecutor;
use xcf_forge::{
    matrix, BuildConfiguration, BuildOptions, Family, Orchestrator, PackageIdentity,
};

#[derive(Parser)]
#[command(name = "xcf-forge")]
#[command(about = "Cache-aware XCFramework build-matrix orchestrator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all requested platform targets, reusing cached artifacts
    Prepare {
        /// Path to the package directory
        #[arg(default_value = ".")]
        package_dir: PathBuf,

        /// Package revision used for cache keying (e.g. a git SHA)
        #[arg(long)]
        revision: String,

        /// Package name; defaults to the package directory name
        #[arg(long)]
        name: Option<String>,

        /// Build configuration (debug or release)
        #[arg(long, default_value = "release")]
        configuration: String,

        /// Platform families to build (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "ios")]
        platforms: Vec<String>,

        /// Also build simulator targets where the platform has them
        #[arg(long)]
        support_simulators: bool,

        /// Embed debug symbols in the produced artifacts
        #[arg(long)]
        embed_debug_symbols: bool,

        /// Free-form label for this request (never affects cache keys)
        #[arg(long)]
        tag: Option<String>,

        /// Cache policy: disabled, project, or local
        #[arg(long)]
        cache_policy: Option<String>,

        /// Cache location for the 'local' policy
        #[arg(long)]
        cache_path: Option<PathBuf>,

        /// Output directory (default: <package_dir>/XCFrameworks)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Maximum units processed concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the run report as JSON instead of the summary line
        #[arg(long)]
        json: bool,
    },

    /// Show the expanded build units and fingerprints without building
    Plan {
        /// Path to the package directory
        #[arg(default_value = ".")]
        package_dir: PathBuf,

        /// Package revision used for cache keying
        #[arg(long)]
        revision: String,

        /// Package name; defaults to the package directory name
        #[arg(long)]
        name: Option<String>,

        /// Build configuration (debug or release)
        #[arg(long, default_value = "release")]
        configuration: String,

        /// Platform families to build (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "ios")]
        platforms: Vec<String>,

        /// Also build simulator targets where the platform has them
        #[arg(long)]
        support_simulators: bool,

        /// Embed debug symbols in the produced artifacts
        #[arg(long)]
        embed_debug_symbols: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            package_dir,
            revision,
            name,
            configuration,
            platforms,
            support_simulators,
            embed_debug_symbols,
            tag,
            cache_policy,
            cache_path,
            output,
            concurrency,
            json,
        } => {
            let package = make_package(&package_dir, name, revision);
            let options = make_options(
                &configuration,
                &platforms,
                support_simulators,
                embed_debug_symbols,
                tag,
            );

            let mut config = match RunConfig::load(&package_dir) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error loading config: {}", e);
                    process::exit(1);
                }
            };
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency.max(1);
            }
            if let Some(policy) = cache_policy {
                config.cache_mode = match parse_cache_policy(&policy, cache_path) {
                    Ok(mode) => mode,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                };
            }

            let cancel = CancelToken::new();
            if let Err(e) = install_signal_handler(cancel.clone()) {
                eprintln!("Error installing signal handler: {}", e);
                process::exit(1);
            }

            let cache: Arc<dyn xcf_forge::CacheStore> =
                Arc::from(open_store(&config.cache_mode, &package_dir));
            let executor = Arc::new(XcodebuildExecutor::new(&package_dir));
            let orchestrator = Orchestrator::new(executor, cache)
                .with_concurrency(config.concurrency)
                .with_cancel_token(cancel);

            let output_dir = output.unwrap_or_else(|| package_dir.join("XCFrameworks"));
            let report = match orchestrator.run(&package, &options, &output_dir) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };

            if json {
                match report.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing report: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("{}", report.human_summary);
            }
            process::exit(report.exit_code);
        }

        Commands::Plan {
            package_dir,
            revision,
            name,
            configuration,
            platforms,
            support_simulators,
            embed_debug_symbols,
        } => {
            let package = make_package(&package_dir, name, revision);
            let options = make_options(
                &configuration,
                &platforms,
                support_simulators,
                embed_debug_symbols,
                None,
            );

            let units = match matrix::expand(&package, &options) {
                Ok(units) => units,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };

            println!("{}: {} build unit(s)", package, units.len());
            for unit in &units {
                println!(
                    "  {:<18} {:<9} {}",
                    unit.platform.sdk_name, unit.platform.variant, unit.fingerprint
                );
            }
        }
    }
}

fn make_package(package_dir: &std::path::Path, name: Option<String>, revision: String) -> PackageIdentity {
    let name = name.unwrap_or_else(|| {
        package_dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "package".to_string())
    });
    PackageIdentity::new(name, revision)
}

fn make_options(
    configuration: &str,
    platforms: &[String],
    support_simulators: bool,
    embed_debug_symbols: bool,
    tag: Option<String>,
) -> BuildOptions {
    let configuration: BuildConfiguration = match configuration.parse() {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut families: BTreeSet<Family> = BTreeSet::new();
    for platform in platforms {
        match platform.parse::<Family>() {
            Ok(family) => {
                families.insert(family);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }

    let mut options = BuildOptions::new(configuration, families)
        .with_simulator_support(support_simulators)
        .with_debug_symbols_embedded(embed_debug_symbols);
    if let Some(tag) = tag {
        options = options.with_tag(tag);
    }
    if let Err(e) = options.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    options
}
