//! sloth CLI
//!
//! Usage:
//!   sloth [OPTIONS] [INPUT]
//!
//! Options:
//!   -o, --output <FILE>   Write the compiled document here (default: stdout)
//!   -c, --config <FILE>   Configuration file (default: ./sloth.toml if present)
//!   -r, --root <DIR>      Scope root for imports and includes
//!   --flatten-slot        Replace filled slots by their children's content
//!   --no-strict           Emit output even if template artifacts remain
//!   -q, --quiet           Only print errors
//!   -v, --verbose         Print resolution and compiler progress
//!   -h, --help            Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use sloth::{compile_file, compile_in, logger, CompileConfig, FsLoader};

const DEFAULT_CONFIG: &str = "sloth.toml";

#[derive(Parser)]
#[command(name = "sloth")]
#[command(about = "Compile HTML templates into one self-contained document")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Output file (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scope root: imports may not resolve outside of it
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Replace filled slots by their children's content
    #[arg(long)]
    flatten_slot: bool,

    /// Do not fail when template artifacts remain in the output
    #[arg(long)]
    no_strict: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Print resolution and compiler progress
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::set_quiet(cli.quiet);
    logger::set_verbose(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => fail(&message),
    };

    let (result, source, filename) = match &cli.input {
        Some(path) => {
            let source = fs::read_to_string(path).unwrap_or_default();
            (
                compile_file(path, &config).await,
                source,
                path.display().to_string(),
            )
        }
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                fail(&format!("Error reading from stdin: {}", e));
            }
            let root = config.root.clone().unwrap_or_else(|| PathBuf::from("."));
            let loader = Arc::new(FsLoader::new(root));
            (
                compile_in(&buffer, "/", loader, &config).await,
                buffer,
                "<stdin>".to_string(),
            )
        }
    };

    let compiled = match result {
        Ok(compiled) => compiled,
        Err(e) => fail(&e.report(&source, &filename)),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &compiled.html) {
                fail(&format!("Error writing '{}': {}", path.display(), e));
            }
            sloth::log!("build"; "wrote {} ({} passes)", path.display(), compiled.passes);
        }
        None => println!("{}", compiled.html),
    }
}

fn load_config(cli: &Cli) -> Result<CompileConfig, String> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => read_config(Path::new(DEFAULT_CONFIG))?,
        None => CompileConfig::default(),
    };

    if let Some(root) = &cli.root {
        config = config.with_root(root.clone());
    }
    if cli.flatten_slot {
        config = config.with_flatten(true);
    }
    if cli.no_strict {
        config = config.with_strict(false);
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<CompileConfig, String> {
    CompileConfig::from_file(path)
        .map_err(|e| format!("Error loading config '{}': {}", path.display(), e))
}

fn fail(message: &str) -> ! {
    logger::error(message);
    std::process::exit(1);
}
