use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use remidi::{DecodePolicy, Decoded, Decoder, RemiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Standard MIDI File
    Mid,
    Yaml,
    Json,
}

/// Decode REMI music tokens into a multi-track MIDI document.
#[derive(Debug, Parser)]
#[command(name = "remidi", version)]
struct Cli {
    /// File of whitespace-separated tokens (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format; inferred from the output extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// YAML decode policy
    #[arg(short, long, conflicts_with = "legacy")]
    config: Option<PathBuf>,

    /// Use the legacy single-track decoding rules
    #[arg(long)]
    legacy: bool,

    /// Name written to the document header
    #[arg(long)]
    name: Option<String>,

    /// Print a summary of skipped tokens to stderr
    #[arg(long)]
    diagnostics: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), RemiError> {
    let policy = load_policy(cli)?;
    let decoder = Decoder::new(policy)?;

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let decoded = decoder.decode(&source);
    if cli.diagnostics {
        eprint!("{}", decoded.diagnostics);
    }

    let format = cli
        .format
        .unwrap_or_else(|| infer_format(cli.output.as_deref()));
    write_output(&decoded, format, cli.output.as_deref())
}

fn load_policy(cli: &Cli) -> Result<DecodePolicy, RemiError> {
    let mut policy = match (&cli.config, cli.legacy) {
        (Some(path), _) => DecodePolicy::from_yaml(&fs::read_to_string(path)?)?,
        (None, true) => DecodePolicy::legacy(),
        (None, false) => DecodePolicy::default(),
    };
    if let Some(name) = &cli.name {
        policy = policy.with_name(name.clone());
    }
    Ok(policy)
}

fn infer_format(output: Option<&Path>) -> OutputFormat {
    let extension = output
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mid") | Some("midi") => OutputFormat::Mid,
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    }
}

fn write_output(decoded: &Decoded, format: OutputFormat, output: Option<&Path>) -> Result<(), RemiError> {
    let document = &decoded.document;
    let bytes = match (format, output) {
        (OutputFormat::Mid, Some(path)) => {
            remidi::write_smf(document, path)?;
            log_written(decoded, path);
            return Ok(());
        }
        (OutputFormat::Mid, None) => {
            return Err(RemiError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "MIDI output needs an --output path",
            )));
        }
        (OutputFormat::Yaml, _) => serde_yaml::to_string(document)?.into_bytes(),
        (OutputFormat::Json, _) => {
            let mut json = serde_json::to_string_pretty(document)?;
            json.push('\n');
            json.into_bytes()
        }
    };

    match output {
        Some(path) => {
            fs::write(path, &bytes)?;
            log_written(decoded, path);
        }
        None => io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn log_written(decoded: &Decoded, path: &Path) {
    log::info!(
        "wrote {} tracks, {} notes to {}",
        decoded.document.tracks.len(),
        decoded.document.note_count(),
        path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_format() {
        assert_eq!(infer_format(Some(Path::new("song.mid"))), OutputFormat::Mid);
        assert_eq!(infer_format(Some(Path::new("song.MIDI"))), OutputFormat::Mid);
        assert_eq!(infer_format(Some(Path::new("song.json"))), OutputFormat::Json);
        assert_eq!(infer_format(Some(Path::new("song.yaml"))), OutputFormat::Yaml);
        assert_eq!(infer_format(None), OutputFormat::Yaml);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["remidi", "tokens.txt", "-o", "out.mid", "--legacy", "-vv"]);
        assert_eq!(cli.input, Some(PathBuf::from("tokens.txt")));
        assert!(cli.legacy);
        assert_eq!(cli.verbose, 2);

        let policy = load_policy(&cli).unwrap();
        assert_eq!(policy, DecodePolicy::legacy());
    }

    #[test]
    fn test_cli_name_override() {
        let cli = Cli::parse_from(["remidi", "--name", "Sketch"]);
        assert_eq!(load_policy(&cli).unwrap().name, "Sketch");
    }

    #[test]
    fn test_config_conflicts_with_legacy() {
        assert!(Cli::try_parse_from(["remidi", "-c", "p.yaml", "--legacy"]).is_err());
    }
}
