//! # encfilter CLI - Character Encoding Filter
//!
//! Command-line front end that guesses the character encoding of text and
//! converts text between encodings. Input comes from a file or stdin, output
//! goes to a file or stdout.

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use tracing::debug;
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use encfilter::detection::DEFAULT_SAMPLE_SIZE;
#[cfg(feature = "cli")]
use encfilter::{Detector, Registry, Transcoder, bom, dump};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// encfilter: character encoding detection and conversion filter
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "encfilter")]
#[command(version, about, long_about = None)]
#[command(author = "encfilter Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the full error chain on failure
    #[arg(long, global = true)]
    debug: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Guess character encoding of the text
    #[command(visible_alias = "g")]
    Guess(GuessArgs),

    /// Convert character encoding of the text
    #[command(visible_aliases = ["e", "encoding"])]
    Enc(EncArgs),

    /// Remove BOM characters from UTF-8 text
    Rbom(RbomArgs),

    /// Hexadecimal view of octet data stream
    #[command(visible_aliases = ["hexdump", "d", "hd"])]
    Dump(DumpArgs),

    /// List all supported encodings
    List(ListArgs),

    /// Validate that a file is properly encoded
    Validate(ValidateArgs),
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct GuessArgs {
    /// Path of input text file (stdin if not specified)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print all guesses, best first
    #[arg(long)]
    all: bool,

    /// Maximum bytes to examine for detection
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Language hint for better detection accuracy
    #[arg(long)]
    language: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct EncArgs {
    /// Path of input text file (stdin if not specified)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path of output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Character encoding name of source text
    #[arg(short = 's', long, default_value = "utf-8")]
    src_encoding: String,

    /// Character encoding name of output text
    #[arg(short = 'd', long, default_value = "utf-8")]
    dst_encoding: String,

    /// Guess character encoding of source text
    #[arg(short, long)]
    guess: bool,

    /// Remove BOM characters in source text (UTF-8 only)
    #[arg(short = 'b', long)]
    remove_bom: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct RbomArgs {
    /// Path of input text file (stdin if not specified)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path of output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct DumpArgs {
    /// Path of input file (stdin if not specified)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print Unicode code points (UTF-8 input only)
    #[arg(short, long)]
    unicode: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ListArgs {
    /// Show only ASCII-compatible encodings
    #[arg(long)]
    ascii_compatible: bool,

    /// Show only multibyte encodings
    #[arg(long)]
    multibyte: bool,

    /// Show encoding details
    #[arg(long)]
    details: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ValidateArgs {
    /// Expected encoding
    #[arg(short, long)]
    encoding: String,

    /// Path of input file (stdin if not specified)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionSummary {
    source_encoding: &'static str,
    target_encoding: &'static str,
    route: String,
    bytes_read: usize,
    bytes_written: usize,
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.debug {
                eprintln!("Error: {err:?}");
            } else {
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<()> {
    let registry = Registry::new();

    match cli.command {
        Commands::Guess(ref args) => guess_command(args, cli, &registry),
        Commands::Enc(ref args) => enc_command(args, cli, &registry),
        Commands::Rbom(ref args) => rbom_command(args),
        Commands::Dump(ref args) => dump_command(args),
        Commands::List(ref args) => list_command(args, cli, &registry),
        Commands::Validate(ref args) => validate_command(args, cli, &registry),
    }
}

#[cfg(feature = "cli")]
fn guess_command(args: &GuessArgs, cli: &Cli, registry: &Registry) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let source = source_name(args.file.as_deref());

    let detector = Detector::with_sample_size(registry, args.sample_size)?;
    let result = match args.language {
        Some(ref language) => detector.detect_with_hint(&input, language),
        None => detector.detect(&input),
    }
    .with_context(|| format!("Failed to guess encoding of {source}"))?;

    match cli.format {
        OutputFormat::Json => {
            let json = if args.all {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string_pretty(result.best())?
            };
            println!("{json}");
        }
        OutputFormat::Text => {
            if args.all {
                println!("{}", result.names().join("\n"));
            } else {
                println!("{}", result.best().encoding);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn enc_command(args: &EncArgs, cli: &Cli, registry: &Registry) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let source = source_name(args.file.as_deref());

    let mut from = args.src_encoding.as_str();
    if args.guess {
        let result = Detector::new(registry)?
            .detect(&input)
            .with_context(|| format!("Failed to guess encoding of {source}"))?;
        from = result.best().encoding;
        debug!(encoding = from, "guessed source encoding");
    }

    let transcoder = Transcoder::new(registry, &args.dst_encoding, from)
        .with_context(|| format!("Cannot convert from {} to {}", from, args.dst_encoding))?;

    let input = if args.remove_bom && transcoder.from_encoding().is_pivot() {
        bom::remove_bom(&input).with_context(|| format!("Failed to remove BOM from {source}"))?
    } else {
        input
    };

    let output = transcoder.convert(&input).with_context(|| {
        format!(
            "Failed to convert {} from {} to {}",
            source,
            transcoder.from_encoding(),
            transcoder.to_encoding()
        )
    })?;
    write_output(args.output.as_deref(), &output)?;

    // Stdout already carries the converted text
    if let (OutputFormat::Json, Some(_)) = (&cli.format, &args.output) {
        let summary = ConversionSummary {
            source_encoding: transcoder.from_encoding().name(),
            target_encoding: transcoder.to_encoding().name(),
            route: format!("{:?}", transcoder.route()),
            bytes_read: input.len(),
            bytes_written: output.len(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn rbom_command(args: &RbomArgs) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let output = bom::remove_bom(&input)
        .with_context(|| format!("Failed to remove BOM from {}", source_name(args.file.as_deref())))?;
    write_output(args.output.as_deref(), &output)
}

#[cfg(feature = "cli")]
fn dump_command(args: &DumpArgs) -> Result<()> {
    let input = read_input(args.file.as_deref())?;

    let line = if args.unicode {
        dump::code_points(&input)
            .with_context(|| format!("Failed to dump code points of {}", source_name(args.file.as_deref())))?
    } else {
        dump::octets(&input)
    };
    println!("{line}");

    Ok(())
}

#[cfg(feature = "cli")]
fn list_command(args: &ListArgs, cli: &Cli, registry: &Registry) -> Result<()> {
    let charsets: Vec<_> = registry
        .charsets()
        .iter()
        .filter(|charset| {
            let codec = charset.codec();
            if args.ascii_compatible && !codec.is_ascii_compatible() {
                return false;
            }
            if args.multibyte && !codec.is_multibyte() {
                return false;
            }
            true
        })
        .collect();

    match cli.format {
        OutputFormat::Json => {
            let charsets_info: Vec<_> = charsets
                .iter()
                .map(|charset| {
                    let codec = charset.codec();
                    serde_json::json!({
                        "name": charset.name,
                        "aliases": charset.aliases,
                        "codec": codec.name(),
                        "ascii_compatible": codec.is_ascii_compatible(),
                        "multibyte": codec.is_multibyte(),
                        "has_bom": codec.bom().is_some()
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&charsets_info)?);
        }
        OutputFormat::Text => {
            println!("Supported Encodings ({} total):", charsets.len());
            println!();

            for charset in charsets {
                println!("{:16} {}", charset.name, charset.aliases.join(", "));

                if args.details {
                    let codec = charset.codec();
                    println!("                 Codec: {codec}");
                    println!(
                        "                 ASCII Compatible: {}",
                        if codec.is_ascii_compatible() { "Yes" } else { "No" }
                    );
                    println!(
                        "                 Multibyte: {}",
                        if codec.is_multibyte() { "Yes" } else { "No" }
                    );
                    if let Some(bom) = codec.bom() {
                        println!("                 BOM: {:02X?}", bom);
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn validate_command(args: &ValidateArgs, cli: &Cli, registry: &Registry) -> Result<()> {
    let codec = registry.resolve(&args.encoding)?;
    let input = read_input(args.file.as_deref())?;
    let source = source_name(args.file.as_deref());

    // Decode directly: a UTF-8 to UTF-8 conversion would skip validation
    let outcome = codec.decode(&input);

    if let OutputFormat::Json = cli.format {
        let report = serde_json::json!({
            "encoding": codec.name(),
            "valid": outcome.is_ok(),
            "characters": outcome.as_ref().ok().map(|text| text.chars().count()),
            "error": outcome.as_ref().err().map(ToString::to_string)
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match outcome {
        Ok(_) => {
            if let OutputFormat::Text = cli.format {
                println!("✓ {} is valid {}", source, codec);
            }
            Ok(())
        }
        Err(cause) => Err(anyhow::Error::new(cause).context(format!("{} is not valid {}", source, codec))),
    }
}

#[cfg(feature = "cli")]
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(feature = "cli")]
fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, data).with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")
        }
    }
}

#[cfg(feature = "cli")]
fn source_name(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "stdin".to_string(),
    }
}
