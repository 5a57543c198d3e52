//! ECCO compiler CLI (`spec.md` §6).

use clap::Parser as ClapParser;
use eccolib::config::CompilationConfig;
use eccolib::diagnostics::LogLevel;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "ecco")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Single-pass compiler for a C-like subset, emitting textual LIR", long_about = None)]
struct Cli {
    /// Source file to compile.
    program: PathBuf,

    /// Output path for the generated LIR. Defaults to the input's stem
    /// with a `.ll` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level for pipeline-stage tracing output.
    #[arg(long, value_enum, default_value = "INFO")]
    logging: LogLevel,

    /// Suppress all tracing output. Equivalent to `--logging NONE`.
    #[arg(long)]
    quiet: bool,

    /// Optimization level: 0 disables constant folding.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    opt: u8,
}

fn main() {
    let cli = Cli::parse();

    let logging = if cli.quiet { LogLevel::None } else { cli.logging };
    install_tracing(logging);

    let output = cli.output.clone().unwrap_or_else(|| {
        let stem = cli.program.file_stem().unwrap_or_default();
        PathBuf::from(stem).with_extension("ll")
    });

    let config = CompilationConfig::new()
        .with_opt_level(cli.opt)
        .with_logging(logging)
        .with_output_path(output.clone());

    if let Err(err) = eccolib::compile_file(&cli.program, &output, &config) {
        eprintln!("ecco: {}", err);
        process::exit(err.exit_code());
    }
}

fn install_tracing(logging: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(logging.filter_directive()).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
