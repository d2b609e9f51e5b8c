use blockdup::{
    deduplicate, reduplicate, ArchiveReader, CollisionPolicy, ContentDigest, DedupConfig, Error,
    DEFAULT_CHUNK_SIZE,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockdup")]
#[command(about = "Fixed-size block deduplication and reconstruction of files")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate a file into an archive
    Dedup {
        /// Source file
        input: PathBuf,
        /// Output archive file
        archive: PathBuf,
        #[command(flatten)]
        opts: DedupOpts,
    },
    /// Rebuild the original file from an archive
    Redup {
        /// Archive file
        archive: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// List the records of an archive
    Inspect {
        /// Archive file
        archive: PathBuf,
    },
    /// Deduplicate, rebuild, and check the result matches the source
    Roundtrip {
        /// Source file
        input: PathBuf,
        /// Archive file to write
        archive: PathBuf,
        /// Rebuilt file to write
        output: PathBuf,
        #[command(flatten)]
        opts: DedupOpts,
    },
}

#[derive(Args)]
struct DedupOpts {
    /// Block size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// What to do when different blocks share a fingerprint
    #[arg(long, value_enum, default_value_t = OnCollision::Fail)]
    on_collision: OnCollision,
}

#[derive(Clone, Copy, ValueEnum)]
enum OnCollision {
    Fail,
    Separate,
}

impl DedupOpts {
    fn config(&self) -> Result<DedupConfig, Error> {
        let policy = match self.on_collision {
            OnCollision::Fail => CollisionPolicy::Fail,
            OnCollision::Separate => CollisionPolicy::Separate,
        };
        Ok(DedupConfig::new(self.chunk_size)?.with_collision_policy(policy))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Dedup {
            input,
            archive,
            opts,
        } => dedup(&input, &archive, &opts.config()?)?,
        Commands::Redup { archive, output } => {
            let stats = reduplicate(&archive, &output)?;
            println!("Rebuilt: {}", output.display());
            println!("  Records: {}", stats.records);
            println!("  Bytes: {}", stats.output_size);
        }
        Commands::Inspect { archive } => inspect(&archive)?,
        Commands::Roundtrip {
            input,
            archive,
            output,
            opts,
        } => {
            dedup(&input, &archive, &opts.config()?)?;
            reduplicate(&archive, &output)?;
            let read = |path: &Path| {
                fs::read(path).map_err(|source| Error::SourceUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            };
            if read(input.as_path())? != read(output.as_path())? {
                return Err(format!(
                    "{} does not match {}",
                    output.display(),
                    input.display()
                )
                .into());
            }
            println!("Round trip OK: {}", output.display());
        }
    }

    Ok(())
}

fn dedup(input: &Path, archive: &Path, config: &DedupConfig) -> Result<(), Error> {
    let stats = deduplicate(input, archive, config)?;
    println!("Created archive: {}", archive.display());
    println!("  Blocks: {}", stats.blocks);
    println!("  Distinct: {}", stats.groups);
    println!(
        "  Stored: {} of {} bytes",
        stats.stored_bytes, stats.source_bytes
    );
    println!("  Archive size: {} bytes", stats.archive_bytes);
    Ok(())
}

fn inspect(archive: &Path) -> Result<(), Error> {
    let file = File::open(archive).map_err(|source| Error::SourceUnreadable {
        path: archive.to_path_buf(),
        source,
    })?;

    let mut records = 0u64;
    let mut occurrences = 0u64;
    for record in ArchiveReader::new(BufReader::new(file)) {
        let record = record?;
        let digest = ContentDigest::of(&record.data).to_hex();
        let offsets: Vec<String> = record.offsets.iter().map(u64::to_string).collect();
        println!(
            "{:>6}  {:>4} x {:>6} bytes  {}  [{}]",
            records,
            record.offsets.len(),
            record.size(),
            &digest[..16],
            offsets.join(", ")
        );
        records += 1;
        occurrences += record.offsets.len() as u64;
    }
    println!("Records: {}", records);
    println!("Occurrences: {}", occurrences);
    Ok(())
}
