use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bpaf::Bpaf;
use miette::NamedSource;
use tracing_subscriber::prelude::*;
use yaml_roundtrip::{DecodeOptions, Decoder, EncodeOptions, Encoder, RoundtripConfig};

/// Re-emit YAML documents, keeping comments and blank lines
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
struct Cli {
    /// Keep blank lines between entries
    #[bpaf(long("preserve-blank-lines"), switch)]
    preserve_blank_lines: bool,

    /// Drop blank lines between entries
    #[bpaf(long("no-preserve-blank-lines"), switch)]
    no_preserve_blank_lines: bool,

    /// Spaces per indentation level
    #[bpaf(long("indent"), argument("N"))]
    indent: Option<usize>,

    /// TOML settings file with [decode] and [encode] tables
    #[bpaf(long("config"), argument("PATH"))]
    config: Option<PathBuf>,

    /// Exit with status 1 when the output would differ from the input
    #[bpaf(long("check"), switch)]
    check: bool,

    /// Input file; standard input when omitted
    #[bpaf(positional("FILE"))]
    file: Option<PathBuf>,
}

fn init_tracing() {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_env("YAML_ROUNDTRIP_LOG") {
        tracing_subscriber::registry()
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_bracketed_fields(true)
                    .with_indent_lines(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .init();
    }
}

fn load_options(cli: &Cli) -> anyhow::Result<(DecodeOptions, EncodeOptions)> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RoundtripConfig::from_toml(&text)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => RoundtripConfig::default(),
    };
    let (mut decode, mut encode) = (config.decode, config.encode);

    let preserve = if cli.preserve_blank_lines {
        Some(true)
    } else if cli.no_preserve_blank_lines {
        Some(false)
    } else {
        None
    };
    if preserve.is_some() {
        decode.preserve_blank_lines = preserve;
        encode.preserve_blank_lines = preserve;
    }
    if let Some(indent) = cli.indent {
        encode.indent = indent;
    }
    Ok((decode, encode))
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<(String, String)> {
    match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), text))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read standard input")?;
            Ok(("<stdin>".to_string(), text))
        }
    }
}

fn reformat(
    input: &str,
    decode: DecodeOptions,
    encode: EncodeOptions,
) -> Result<String, yaml_roundtrip::Error> {
    let mut decoder = Decoder::with_options(input.as_bytes(), decode);
    let mut encoder = Encoder::with_options(Vec::new(), encode);
    while let Some(document) = decoder.decode()? {
        encoder.encode(&document)?;
    }
    let bytes = encoder.finish()?;
    String::from_utf8(bytes).map_err(|e| yaml_roundtrip::Error::Encode(e.to_string()))
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let (decode, encode) = load_options(cli)?;
    let (name, input) = read_input(cli.file.as_ref())?;

    let output = match reformat(&input, decode, encode) {
        Ok(output) => output,
        Err(err) => {
            let report =
                miette::Report::new(err).with_source_code(NamedSource::new(name, input));
            eprintln!("{report:?}");
            return Ok(ExitCode::from(2));
        }
    };

    if cli.check {
        if output == input {
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{name}: output differs from input");
        return Ok(ExitCode::from(1));
    }
    std::io::stdout()
        .write_all(output.as_bytes())
        .context("failed to write output")?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = cli().run();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
