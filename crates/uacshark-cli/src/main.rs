use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flexi_logger::{Logger, LoggerHandle};
use glob::glob;
use log::{debug, info};
use serde::Serialize;
use uacshark_core::{
    AudioSubclass, DecodedDescriptor, InterfaceInfo, Report, Session, decode_descriptor,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("UACSHARK_BUILD_COMMIT"),
    ", built ",
    env!("UACSHARK_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "uacshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline decoder for USB Audio class descriptors and USB-MIDI SysEx traces.",
    long_about = None,
    after_help = "Examples:\n  uacshark trace analyse trace.json -o report.json\n  uacshark trace analyze trace.json --stdout --pretty\n  uacshark descriptor decode 0824 0a10010700 00 --subclass control --header 092401000208400000"
)]
struct Cli {
    /// Log filter for stderr (e.g. warn, debug, uacshark_core=trace); RUST_LOG applies when omitted
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on JSON trace files of demuxed USB records.
    Trace {
        #[command(subcommand)]
        command: TraceCommands,
    },
    /// Operations on single descriptors given as hex.
    Descriptor {
        #[command(subcommand)]
        command: DescriptorCommands,
    },
}

impl Commands {
    fn quiet(&self) -> bool {
        matches!(
            self,
            Commands::Trace {
                command: TraceCommands::Analyse { quiet: true, .. }
            }
        )
    }
}

#[derive(Subcommand, Debug)]
enum TraceCommands {
    /// Analyse a trace file and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  uacshark trace analyse trace.json -o report.json\n  uacshark trace analyze 'captures/*.json' --stdout"
    )]
    Analyse {
        /// Path to a .json trace file (a glob matching exactly one file is accepted)
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if warning diagnostics are present
        #[arg(long)]
        strict: bool,

        /// List diagnostics after analysis
        #[arg(long)]
        list_diagnostics: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DescriptorCommands {
    /// Decode one class-specific descriptor against a fresh session.
    Decode {
        /// Descriptor bytes as hex; whitespace is ignored
        #[arg(num_args = 1.., required = true)]
        hex: Vec<String>,

        /// Interface subclass the descriptor belongs to
        #[arg(long, value_enum)]
        subclass: SubclassArg,

        /// Audio control header decoded first to set the session version
        #[arg(long)]
        header: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SubclassArg {
    Control,
    Streaming,
}

impl From<SubclassArg> for AudioSubclass {
    fn from(value: SubclassArg) -> Self {
        match value {
            SubclassArg::Control => AudioSubclass::AudioControl,
            SubclassArg::Streaming => AudioSubclass::AudioStreaming,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.command.quiet() {
        Some("error")
    } else {
        cli.log_level.as_deref()
    };
    let result = init_logging(level).and_then(|_logger| run(cli.command));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Trace { command } => match command {
            TraceCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                list_diagnostics,
            } => cmd_trace_analyse(
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                list_diagnostics,
            ),
        },
        Commands::Descriptor { command } => match command {
            DescriptorCommands::Decode {
                hex,
                subclass,
                header,
                pretty,
            } => cmd_descriptor_decode(&hex.concat(), subclass, header.as_deref(), pretty),
        },
    }
}

/// The returned handle must stay alive for logging to keep working.
fn init_logging(level: Option<&str>) -> Result<LoggerHandle, CliError> {
    let logger = match level {
        Some(spec) => Logger::try_with_str(spec),
        None => Logger::try_with_env_or_str("warn"),
    };
    logger
        .and_then(|logger| logger.log_to_stderr().start())
        .map_err(|err| {
            CliError::new(
                format!("invalid log level: {err}"),
                Some("use a level such as warn, info or debug, or module=level pairs".to_string()),
            )
        })
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_trace_analyse(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    list_diagnostics: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        let report_abs = report_path
            .parent()
            .map(|parent| {
                if parent.as_os_str().is_empty() {
                    fs::canonicalize(".")
                } else {
                    fs::canonicalize(parent)
                }
            })
            .transpose()
            .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
        if let Some(report_dir) = report_abs {
            let report_target = report_dir.join(
                report_path
                    .file_name()
                    .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
            );
            if report_target == input_abs {
                return Err(CliError::new(
                    format!(
                        "report path must differ from input: {}",
                        report_path.display()
                    ),
                    Some("choose a different output path".to_string()),
                ));
            }
        }
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;

    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .json trace file".to_string()),
        ));
    }

    debug!("analysing trace {}", input_abs.display());
    let rep = uacshark_core::analyze_trace_file(&resolved_input).context("Trace analysis failed")?;
    info!(
        "analysed {} records, {} diagnostic ids",
        rep.trace_summary.as_ref().map_or(0, |summary| summary.records_total),
        rep.diagnostics.len()
    );
    let json = serialize_json(&rep, pretty, compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            info!("report written to {}", report.display());
            if !quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if list_diagnostics && !quiet {
        print_diagnostics(&rep);
    }
    if strict && has_warnings(&rep) {
        return Err(CliError::new(
            "warning diagnostics detected",
            Some("use --list-diagnostics to inspect".to_string()),
        ));
    }
    Ok(())
}

#[derive(Serialize)]
struct DecodeOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<DecodedDescriptor>,
    descriptor: DecodedDescriptor,
}

fn cmd_descriptor_decode(
    hex_input: &str,
    subclass: SubclassArg,
    header: Option<&str>,
    pretty: bool,
) -> Result<(), CliError> {
    let mut session = Session::new();
    let header = header
        .map(|text| {
            let bytes = parse_hex_arg(text, "--header")?;
            let control = InterfaceInfo::audio(AudioSubclass::AudioControl);
            decode_one(&bytes, &control, &mut session)
        })
        .transpose()?;

    let bytes = parse_hex_arg(hex_input, "descriptor")?;
    let iface = InterfaceInfo::audio(subclass.into());
    let descriptor = decode_one(&bytes, &iface, &mut session)?;

    let json = serialize_json(&DecodeOutput { header, descriptor }, pretty, false)?;
    println!("{}", json);
    Ok(())
}

fn decode_one(
    bytes: &[u8],
    iface: &InterfaceInfo,
    session: &mut Session,
) -> Result<DecodedDescriptor, CliError> {
    match decode_descriptor(bytes, iface, session) {
        Ok(Some(decoded)) => Ok(decoded),
        Ok(None) => Err(CliError::new(
            "not a class-specific audio descriptor for this subclass",
            Some(
                "byte 1 must be 0x24 (class interface), or 0x25 (class endpoint) with --subclass streaming"
                    .to_string(),
            ),
        )),
        Err(err) => Err(CliError::new(
            format!("descriptor rejected: {err}"),
            Some("check the bLength byte and pass the whole descriptor".to_string()),
        )),
    }
}

fn parse_hex_arg(text: &str, what: &str) -> Result<Vec<u8>, CliError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&compact).map_err(|err| {
        CliError::new(
            format!("invalid {what} hex: {err}"),
            Some("pass bytes as hex pairs, e.g. 0924010001".to_string()),
        )
    })
}

fn serialize_json<T: Serialize>(value: &T, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn has_warnings(rep: &Report) -> bool {
    rep.diagnostics
        .iter()
        .any(|entry| entry.severity == "warning")
}

fn print_diagnostics(rep: &Report) {
    eprintln!("Diagnostics:");
    for entry in &rep.diagnostics {
        eprintln!("  {} {} ({})", entry.severity, entry.id, entry.count);
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .json trace file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "json" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .json trace file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected a .json trace".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut message = format!("multiple files match pattern '{}' ({} matches)", pattern, count);
            let listed: Vec<_> = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect();
            message.push_str("; matches: ");
            message.push_str(&listed.join(", "));
            if count > 3 {
                message.push_str(", ...");
            }
            Err(CliError::new(
                message,
                Some("pass a single trace file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
