//! flamestitch CLI
//!
//! Builds call trees from profiling fragments, stitches fragments over a
//! time window, aggregates stored fragments into flamegraphs and detects
//! known performance issues.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use flamestitch::commands::{
    display_version, execute_calltree, execute_convert, execute_detect, execute_flamegraph,
    execute_functions, execute_stitch, validate_calltree_args, validate_flamegraph_args,
    validate_functions_args, validate_stitch_args, CalltreeArgs, ConvertArgs, DetectArgs,
    FlamegraphArgs, FunctionsArgs, StitchArgs,
};
use flamestitch::flamegraph::{FlamegraphConfig, FunctionMetricsOptions};
use flamestitch::slice::Interval;
use flamestitch::utils::config::{
    DEFAULT_FUNCTION_MIN_DEPTH, DEFAULT_MAX_FLAMEGRAPH_SAMPLES, DEFAULT_MAX_UNIQUE_FUNCTIONS,
    DEFAULT_MIN_FREQUENCY, DEFAULT_READ_WORKERS, MAX_STACK_DEPTH, STORAGE_DIR_ENV, STORAGE_URL_ENV,
};

/// flamestitch - call-tree algebra for profiling fragments
#[derive(Parser, Debug)]
#[command(name = "flamestitch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build per-thread call trees from a fragment
    Calltree {
        /// Fragment JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Only build this thread
        #[arg(short, long)]
        thread: Option<String>,

        /// Deepest stack level kept
        #[arg(long, default_value_t = MAX_STACK_DEPTH)]
        max_depth: usize,

        /// Keep only START:END (nanoseconds); may be repeated
        #[arg(long = "slice")]
        slices: Vec<Interval>,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stitch fragments into one over a time window
    Stitch {
        /// Fragment JSON files
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Window start, nanoseconds since the epoch
        #[arg(long)]
        start: u64,

        /// Window end (exclusive), nanoseconds since the epoch
        #[arg(long)]
        end: u64,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the output profile format instead of a fragment
        #[arg(long)]
        speedscope: bool,
    },

    /// Aggregate stored fragments into a flamegraph
    Flamegraph {
        /// Storage keys of the fragments; may be repeated
        #[arg(long = "object", required = true, num_args = 1..)]
        objects: Vec<String>,

        /// Directory backing the object store
        #[arg(long, env = STORAGE_DIR_ENV, conflicts_with = "storage_url")]
        storage_dir: Option<PathBuf>,

        /// Base URL of an HTTP object store
        #[arg(long, env = STORAGE_URL_ENV)]
        storage_url: Option<String>,

        /// Drop stacks seen fewer times than this
        #[arg(long, default_value_t = DEFAULT_MIN_FREQUENCY)]
        min_frequency: u64,

        /// Keep at most this many stacks, heaviest first
        #[arg(long, default_value_t = DEFAULT_MAX_FLAMEGRAPH_SAMPLES)]
        max_samples: usize,

        /// Also aggregate application function metrics
        #[arg(long)]
        function_metrics: bool,

        /// Most distinct functions kept when aggregating metrics
        #[arg(long, default_value_t = DEFAULT_MAX_UNIQUE_FUNCTIONS)]
        max_functions: usize,

        /// Concurrent storage reads
        #[arg(long, default_value_t = DEFAULT_READ_WORKERS)]
        workers: usize,

        /// Give up on reads after this many seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Output path for SVG flamegraph (optional)
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect known performance issues in a fragment
    Detect {
        /// Fragment JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Active thread (defaults to the fragment's main thread)
        #[arg(short, long)]
        thread: Option<String>,

        /// Ignore matches shorter than this many milliseconds
        #[arg(long, default_value = "0")]
        min_duration_ms: u64,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank a fragment's functions by self time
    Functions {
        /// Fragment JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Only this thread
        #[arg(short, long)]
        thread: Option<String>,

        /// Shallowest call depth counted (roots are 0)
        #[arg(long, default_value_t = DEFAULT_FUNCTION_MIN_DEPTH)]
        min_depth: usize,

        /// Most functions reported
        #[arg(long, default_value_t = DEFAULT_MAX_UNIQUE_FUNCTIONS)]
        max_functions: usize,

        /// Report system functions as well
        #[arg(long)]
        include_system: bool,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a fragment to the output profile format
    Convert {
        /// Fragment JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Calltree {
            input,
            thread,
            max_depth,
            slices,
            output,
        } => {
            let args = CalltreeArgs {
                input,
                thread,
                max_depth,
                slices,
                output,
            };
            validate_calltree_args(&args)?;
            execute_calltree(args)?;
        }

        Commands::Stitch {
            inputs,
            start,
            end,
            output,
            speedscope,
        } => {
            let args = StitchArgs {
                inputs,
                start_ns: start,
                end_ns: end,
                output,
                as_output: speedscope,
            };
            validate_stitch_args(&args)?;
            execute_stitch(args)?;
        }

        Commands::Flamegraph {
            objects,
            storage_dir,
            storage_url,
            min_frequency,
            max_samples,
            function_metrics,
            max_functions,
            workers,
            timeout_secs,
            svg,
            title,
            width,
            output,
        } => {
            let flamegraph_config = svg.as_ref().map(|_| {
                let config = FlamegraphConfig::new().with_width(width);
                match title {
                    Some(title) => config.with_title(title),
                    None => config,
                }
            });

            let args = FlamegraphArgs {
                objects,
                storage_dir,
                storage_url,
                min_frequency,
                max_samples,
                workers,
                timeout: std::time::Duration::from_secs(timeout_secs),
                function_metrics: function_metrics.then(|| FunctionMetricsOptions {
                    max_unique_functions: max_functions,
                    ..Default::default()
                }),
                svg,
                flamegraph_config,
                output,
            };
            validate_flamegraph_args(&args)?;
            execute_flamegraph(args)?;
        }

        Commands::Detect {
            input,
            thread,
            min_duration_ms,
            output,
        } => {
            execute_detect(DetectArgs {
                input,
                thread,
                min_duration_ms,
                output,
            })?;
        }

        Commands::Functions {
            input,
            thread,
            min_depth,
            max_functions,
            include_system,
            output,
        } => {
            let args = FunctionsArgs {
                input,
                thread,
                min_depth,
                max_functions,
                include_system,
                output,
            };
            validate_functions_args(&args)?;
            execute_functions(args)?;
        }

        Commands::Convert { input, output } => {
            execute_convert(ConvertArgs { input, output })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
