mod config;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use courgette_codegen::{compile_document, Compilation, GenerateConfig};
use courgette_core::{lint, parse_document, Diagnostic, Severity};
use tracing::debug;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Courgette benefit-rule compiler.
#[derive(Parser)]
#[command(name = "courgette", version, about = "Courgette benefit-rule compiler")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log parser and generator decisions to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Path to a courgette.toml (default: ./courgette.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .courgette file to OpenFisca rules and parameters
    Compile {
        /// Path to the .courgette source file
        file: PathBuf,
        /// Directory to write <stem>.py and <stem>_parameters.yaml into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the parsed document model as JSON
    Parse {
        /// Path to the .courgette source file
        file: PathBuf,
    },

    /// Check a .courgette file and report problems
    Lint {
        /// Path to the .courgette source file
        file: PathBuf,
    },

    /// Start the local compiler service
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
        /// Directory of static files served for unmatched routes
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    debug!(?settings, "configuration loaded");

    match cli.command {
        Commands::Compile { file, out } => {
            cmd_compile(
                &file,
                out.as_deref(),
                &settings.generate,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Parse { file } => {
            cmd_parse(&file, cli.output, cli.quiet);
        }
        Commands::Lint { file } => {
            cmd_lint(&file, cli.output, cli.quiet);
        }
        Commands::Serve { port, dir } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(port, dir, settings.generate)) {
                report_error(&format!("Server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr so compiled output on stdout stays clean.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(file: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            report_error(
                &format!("error reading file '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

// ──────────────────────────────────────────────
// Subcommand implementations
// ──────────────────────────────────────────────

fn cmd_compile(
    file: &Path,
    out: Option<&Path>,
    config: &GenerateConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);
    let compilation = compile_document(&source, config);
    print_diagnostics(file, &compilation.diagnostics, output, quiet, true);

    match out {
        Some(dir) => write_outputs(file, dir, &compilation, output, quiet),
        None => match output {
            OutputFormat::Text => {
                print!("{}", compilation.rules);
                println!();
                print!("{}", compilation.parameters);
            }
            OutputFormat::Json => print_json(&compilation, output, quiet),
        },
    }
}

fn write_outputs(
    file: &Path,
    dir: &Path,
    compilation: &Compilation,
    output: OutputFormat,
    quiet: bool,
) {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rules");
    let rules_path = dir.join(format!("{}.py", stem));
    let params_path = dir.join(format!("{}_parameters.yaml", stem));

    let written = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&rules_path, &compilation.rules))
        .and_then(|_| std::fs::write(&params_path, &compilation.parameters));
    if let Err(e) = written {
        report_error(
            &format!("error writing to '{}': {}", dir.display(), e),
            output,
            quiet,
        );
        process::exit(1);
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                println!("Wrote {}", rules_path.display());
                println!("Wrote {}", params_path.display());
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "rules": rules_path.display().to_string(),
                "parameters": params_path.display().to_string(),
                "diagnostics": compilation.diagnostics,
            });
            print_json(&result, output, quiet);
        }
    }
}

fn cmd_parse(file: &Path, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let doc = parse_document(&source);
    print_json(&doc, output, quiet);
}

fn cmd_lint(file: &Path, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let diagnostics = lint(&source);
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();

    match output {
        OutputFormat::Text => {
            print_diagnostics(file, &diagnostics, output, quiet, false);
            if !quiet && diagnostics.is_empty() {
                println!("{}: no problems found", file.display());
            }
        }
        OutputFormat::Json => {
            print_json(
                &serde_json::json!({ "diagnostics": diagnostics }),
                output,
                quiet,
            );
        }
    }

    if errors > 0 {
        process::exit(1);
    }
}

// ──────────────────────────────────────────────
// Output helpers
// ──────────────────────────────────────────────

/// Text-mode diagnostics as `file:line:col: severity: message`. Compile
/// sends them to stderr so the generated code on stdout stays usable.
fn print_diagnostics(
    file: &Path,
    diagnostics: &[Diagnostic],
    output: OutputFormat,
    quiet: bool,
    to_stderr: bool,
) {
    if quiet || output == OutputFormat::Json {
        return;
    }
    for d in diagnostics {
        if to_stderr {
            eprintln!("{}:{}", file.display(), d);
        } else {
            println!("{}:{}", file.display(), d);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, output: OutputFormat, quiet: bool) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

/// Report an error message to stderr in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
