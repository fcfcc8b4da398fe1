use clap::{ArgAction, Parser, Subcommand};
use derive_more::{Display, Error};
use exn::ResultExt;
use pacstage_config::Config;
use pacstage_extract::{LoadOptions, PackageRecord};
use pacstage_library::{Pool, ScanOptions, SymlinkPolicy, Target, load_database, read_targets, scan};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pacstage", version, about = "Index a pool of package archives")]
struct Cli {
    /// Configuration file to read instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging output (repeat for more).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find the newest build of each package in a pool.
    Scan {
        /// Package names (`zlib`, `zlib>=1.3`) or archive filenames to keep.
        targets: Vec<String>,
        /// Directory of package archives.
        #[arg(long)]
        pool: Option<PathBuf>,
        /// Architecture to keep besides `any`, or `none` to keep everything.
        #[arg(long)]
        arch: Option<String>,
        /// Read targets from this file when none are given.
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Include symbolic links that point at regular files.
        #[arg(long)]
        follow_symlinks: bool,
        /// Collect each package's file list.
        #[arg(long)]
        files: bool,
        /// Also print architecture, filename and sizes.
        #[arg(short, long)]
        long: bool,
    },
    /// Print the packages held in an existing repository database.
    List {
        database: PathBuf,
        #[arg(short, long)]
        long: bool,
    },
}

#[derive(Debug, Display, Error)]
enum CliError {
    #[display("could not load configuration")]
    Config,
    #[display("invalid target list")]
    Targets,
    #[display("scan failed")]
    Scan,
    #[display("could not read database")]
    Database,
    #[display("could not write output")]
    Output,
}

type Result<T> = std::result::Result<T, exn::Exn<CliError>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("PACSTAGE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| CliError::Config)?;
    match cli.command {
        Commands::Scan {
            targets,
            pool,
            arch,
            manifest,
            follow_symlinks,
            files,
            long,
        } => {
            if let Some(pool) = pool {
                config.pool = pool;
            }
            if let Some(arch) = arch {
                config.arch = arch;
            }
            if manifest.is_some() {
                config.manifest = manifest;
            }
            if follow_symlinks {
                config.symlinks = SymlinkPolicy::Follow;
            }
            config.files |= files;
            tracing::debug!(?config, "resolved configuration");

            let options = ScanOptions {
                targets: resolve_targets(&targets, &config)?,
                arch: config.arch_filter().map(str::to_string),
                symlinks: config.symlinks,
                load: LoadOptions { files: config.files },
            };
            let pool = Pool::open(&config.pool).or_raise(|| CliError::Scan)?;
            let cache = scan(&pool, &options).or_raise(|| CliError::Scan)?;
            print_records(cache.iter(), long)
        },
        Commands::List { database, long } => {
            tracing::debug!(database = %database.display(), "reading repository database");
            let cache = load_database(&database).or_raise(|| CliError::Database)?;
            print_records(cache.iter(), long)
        },
    }
}

/// Targets from the command line, or from the manifest file if none were given.
fn resolve_targets(targets: &[String], config: &Config) -> Result<Vec<Target>> {
    if targets.is_empty() {
        return match &config.manifest {
            Some(path) => read_targets(path).or_raise(|| CliError::Targets),
            None => Ok(Vec::new()),
        };
    }
    targets
        .iter()
        .map(|target| target.parse::<Target>().or_raise(|| CliError::Targets))
        .collect()
}

fn print_records<'a>(records: impl Iterator<Item = &'a PackageRecord>, long: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    for record in records {
        let written = if long {
            writeln!(
                out,
                "{} {} {} {} {} {}",
                record.name(),
                record.version(),
                record.architecture.as_deref().unwrap_or("-"),
                record.filename.as_deref().unwrap_or("-"),
                record.compressed_size,
                record.installed_size,
            )
        } else {
            writeln!(out, "{} {}", record.name(), record.version())
        };
        match written {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            written => written.or_raise(|| CliError::Output)?,
        }
    }
    Ok(())
}
