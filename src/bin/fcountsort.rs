use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::{LevelFilter, info};

use countsort_rs::countsort::{CountFormat, CountSortConfig, CountSortError, Engine, Stats};

#[derive(Parser)]
#[command(
    name = "fcountsort",
    version,
    about = "Count distinct lines of a large file, most frequent first",
    after_help = "Equivalent to 'sort | uniq -c | sort -rn', bounded by CHUNK_SIZE lines \
                  held in memory at once. Lines with equal counts keep byte order."
)]
struct Cli {
    /// Lines held in memory per sorted run (at least 2)
    #[arg(value_name = "CHUNK_SIZE")]
    chunk_size: usize,

    /// Input file ('-' for standard input)
    #[arg(short = 'i', long = "input", value_name = "FILE", default_value = "input.txt")]
    input: String,

    /// Output file ('-' for standard output)
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "output.txt")]
    output: String,

    /// Use DIR for temporaries, not $TMPDIR or /tmp
    #[arg(short = 'T', long = "temporary-directory", value_name = "DIR")]
    temp_dir: Option<String>,

    /// Print only the values, not the TAB-separated counts
    #[arg(long = "no-counts")]
    no_counts: bool,

    /// Line delimiter is NUL, not newline
    #[arg(short = 'z', long = "zero-terminated")]
    zero_terminated: bool,

    /// Log progress to stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// Exit status for invalid arguments, as GNU sort uses.
const EXIT_USAGE: i32 = 2;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Run the engine and always release its workspace, whatever `run` returned.
fn run(config: CountSortConfig) -> anyhow::Result<Stats> {
    let mut engine = Engine::create(config).context("cannot create workspace")?;
    let result = engine.run();
    Ok(engine.complete(result)?)
}

fn main() {
    countsort_rs::common::reset_sigpipe();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CountSortConfig {
        chunk_capacity: cli.chunk_size,
        input: cli.input,
        output: cli.output,
        temp_dir: cli.temp_dir,
        format: if cli.no_counts {
            CountFormat::ValueOnly
        } else {
            CountFormat::Tabbed
        },
        zero_terminated: cli.zero_terminated,
    };

    if let Err(e) = config.validate() {
        eprintln!("fcountsort: {}", e);
        eprintln!("Try 'fcountsort --help' for more information.");
        process::exit(EXIT_USAGE);
    }

    match run(config) {
        Ok(stats) => info!(
            "{} sorted runs, {} lines, {} distinct values, {} bytes written",
            stats.runs, stats.lines, stats.distinct, stats.bytes_written
        ),
        Err(e) => {
            // Ignore broken pipe
            if let Some(cs) = e.downcast_ref::<CountSortError>() {
                if cs.is_broken_pipe() {
                    return;
                }
            }
            eprintln!("fcountsort: {:#}", e);
            process::exit(1);
        }
    }
}
