// foma-cli: shared utilities for the command-line tools.

use std::path::PathBuf;
use std::process;

use foma_fst::bulk::Direction;
use foma_fst::{Fst, Orientation, TraversalLimits};
use tracing_subscriber::EnvFilter;

/// Environment variable naming a default transducer file.
pub const FST_PATH_ENV: &str = "FOMA_FST_PATH";

/// Options shared by the lookup tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub fst_path: Option<PathBuf>,
    pub orientation: Orientation,
    pub direction: Direction,
    pub limits: TraversalLimits,
    /// Remaining positional arguments.
    pub words: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fst_path: None,
            orientation: Orientation::Normal,
            direction: Direction::Analyze,
            limits: TraversalLimits::default(),
            words: Vec::new(),
        }
    }
}

/// Parse command-line arguments (without the program name).
///
/// The first positional argument is the transducer unless `-f`/`--fst` or
/// `FOMA_FST_PATH` names it.
pub fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };

        if let Some(val) = arg.strip_prefix("--fst=") {
            options.fst_path = Some(PathBuf::from(val));
        } else if arg == "--fst" || arg == "-f" {
            options.fst_path = Some(PathBuf::from(value_for(arg)?));
        } else if let Some(val) = arg.strip_prefix("--orientation=") {
            options.orientation = val.parse().map_err(|e| format!("{e}"))?;
        } else if arg == "--orientation" {
            options.orientation = value_for(arg)?.parse().map_err(|e| format!("{e}"))?;
        } else if arg == "--invert" || arg == "-i" {
            options.orientation = Orientation::Invert;
        } else if arg == "--generate" || arg == "-g" {
            options.direction = Direction::Generate;
        } else if let Some(val) = arg.strip_prefix("--max-depth=") {
            options.limits.max_depth = parse_depth(val)?;
        } else if arg == "--max-depth" {
            options.limits.max_depth = parse_depth(&value_for(arg)?)?;
        } else if arg == "--" {
            positional.extend(iter.by_ref().cloned());
        } else if arg.starts_with('-') && arg.len() > 1 {
            return Err(format!("unknown option {arg}"));
        } else {
            positional.push(arg.clone());
        }
    }

    let mut positional = positional.into_iter();
    if options.fst_path.is_none() {
        options.fst_path = std::env::var_os(FST_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| positional.next().map(PathBuf::from));
    }
    options.words = positional.collect();
    Ok(options)
}

fn parse_depth(val: &str) -> Result<usize, String> {
    match val.parse::<usize>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(format!("--max-depth expects a positive integer, got {val:?}")),
    }
}

/// Load the transducer named by `options`.
pub fn load_fst(options: &Options) -> Result<Fst, String> {
    let path = options
        .fst_path
        .as_ref()
        .ok_or_else(|| format!("no transducer given; pass FST or set {FST_PATH_ENV}"))?;
    let fst = Fst::from_file(path, options.orientation)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(fst.with_limits(options.limits))
}

/// Install a stderr subscriber filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}
