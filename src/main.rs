//! vconsole - render ANSI-styled process output
//!
//! Reads output from a file or stdin in chunks, runs it through the virtual
//! console and prints the result as HTML, plain text or re-rendered ANSI.
//!
//! # Quick Start
//!
//! ```text
//! ls --color=always | vconsole > out.html
//! vconsole --format text build.log
//! vconsole --stylesheet --scheme nord test-output.txt
//! ```

use std::env;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vconsole::config::{self, ColorScheme, Config};
use vconsole::ui::stylesheet;
use vconsole::{AnsiMode, ConsoleOutputWriter, TerminalRenderer};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Html,
    Text,
    Ansi,
}

/// Command line options
struct Options {
    /// Input file, stdin when absent
    input: Option<PathBuf>,
    format: OutputFormat,
    mode: Option<AnsiMode>,
    max_lines: Option<usize>,
    chunk_size: usize,
    /// Emit the CSS stylesheet before HTML output
    stylesheet: bool,
    scheme: Option<String>,
    log_level: Option<String>,
    /// Write the effective configuration to ~/.vconsole/config.toml
    init_config: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: None,
            format: OutputFormat::Html,
            mode: None,
            max_lines: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stylesheet: false,
            scheme: None,
            log_level: None,
            init_config: false,
        }
    }
}

fn print_version() {
    eprintln!("vconsole {}", VERSION);
}

fn print_help() {
    eprintln!("vconsole {} - Render ANSI-styled process output", VERSION);
    eprintln!();
    eprintln!("Usage: vconsole [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Reads FILE, or stdin when no file is given.");
    eprintln!();
    eprintln!("Output options:");
    eprintln!("  -f, --format <FMT>    html (default), text, ansi");
    eprintln!("  --stylesheet          Emit CSS before HTML output");
    eprintln!("  --scheme <NAME>       Color scheme: {}", ColorScheme::list().join(", "));
    eprintln!();
    eprintln!("Console options:");
    eprintln!("  -m, --mode <MODE>     ANSI handling: on, off, strip");
    eprintln!("  --max-lines <N>       Keep at most N lines (0 = unlimited)");
    eprintln!("  --chunk-size <N>      Bytes per read (default {})", DEFAULT_CHUNK_SIZE);
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  --log-level <LEVEL>   Log level for ~/.vconsole/vconsole.log");
    eprintln!("  --init-config         Save effective settings to ~/.vconsole/config.toml");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    fn value<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| format!("Missing value for {}", name))
    }

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-f" | "--format" => {
                i += 1;
                options.format = match value(&args, i, "--format")? {
                    "html" => OutputFormat::Html,
                    "text" => OutputFormat::Text,
                    "ansi" => OutputFormat::Ansi,
                    other => return Err(format!("Unknown format: {}", other)),
                };
            }
            "-m" | "--mode" => {
                i += 1;
                let name = value(&args, i, "--mode")?;
                options.mode = Some(
                    AnsiMode::from_name(name).ok_or_else(|| format!("Unknown mode: {}", name))?,
                );
            }
            "--max-lines" => {
                i += 1;
                let n = value(&args, i, "--max-lines")?;
                options.max_lines = Some(n.parse().map_err(|_| format!("Invalid line count: {}", n))?);
            }
            "--chunk-size" => {
                i += 1;
                let n = value(&args, i, "--chunk-size")?;
                options.chunk_size = match n.parse() {
                    Ok(size) if size > 0 => size,
                    _ => return Err(format!("Invalid chunk size: {}", n)),
                };
            }
            "--init-config" => {
                options.init_config = true;
            }
            "--stylesheet" => {
                options.stylesheet = true;
            }
            "--scheme" => {
                i += 1;
                options.scheme = Some(value(&args, i, "--scheme")?.to_string());
            }
            "--log-level" => {
                i += 1;
                options.log_level = Some(value(&args, i, "--log-level")?.to_string());
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            path => {
                if options.input.is_some() {
                    return Err(format!("Unexpected argument: {}", path));
                }
                if path != "-" {
                    options.input = Some(PathBuf::from(path));
                }
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.vconsole/vconsole.log`; `--log-level` wins over `RUST_LOG`
fn init_logging(level: Option<&str>) {
    let log_path = config::config_dir()
        .map(|dir| dir.join("vconsole.log"))
        .unwrap_or_else(|| PathBuf::from("vconsole.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Decode as much of `carry` + `bytes` as forms complete UTF-8.
///
/// A multi-byte character split across reads stays in `carry`.
fn decode_chunk(carry: &mut Vec<u8>, bytes: &[u8]) -> String {
    carry.extend_from_slice(bytes);
    match std::str::from_utf8(carry) {
        Ok(text) => {
            let text = text.to_string();
            carry.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
            carry.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(carry).into_owned();
            carry.clear();
            text
        }
    }
}

/// Feed `reader` to `writer` chunk by chunk, trimming to the line limit as
/// output arrives. Returns the highest line count held after any chunk.
fn feed<R: Read>(reader: &mut R, writer: &mut ConsoleOutputWriter, chunk_size: usize) -> anyhow::Result<usize> {
    let mut buf = vec![0u8; chunk_size];
    let mut carry = Vec::new();
    let mut chunks = 0usize;
    let mut trims = 0usize;
    let mut peak = 0usize;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read input"),
        };
        let text = decode_chunk(&mut carry, &buf[..n]);
        if !text.is_empty() && !writer.output(&text, "", false, false) {
            trims += 1;
        }
        peak = peak.max(writer.current_lines());
        chunks += 1;
    }
    if !carry.is_empty() && !writer.output(&String::from_utf8_lossy(&carry), "", false, false) {
        trims += 1;
    }
    peak = peak.max(writer.current_lines());

    if trims > 0 {
        debug!("Trimmed output {} times, {} lines kept", trims, writer.current_lines());
    }
    info!("Read {} chunks, {} lines", chunks, writer.current_lines());
    Ok(peak)
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(options.log_level.as_deref());
    info!("vconsole {} starting", VERSION);

    let mut config = Config::load();
    if let Some(mode) = options.mode {
        config.ansi_mode = mode;
    }
    if let Some(max_lines) = options.max_lines {
        config.max_output_lines = max_lines;
    }
    if let Some(scheme) = &options.scheme {
        config.color_scheme = scheme.clone();
    }

    if options.init_config {
        config.save().context("Failed to save configuration")?;
        info!("Saved configuration");
        return Ok(());
    }

    let mut writer = ConsoleOutputWriter::from_config(&config);
    // Nothing reads announcements back in batch mode
    writer.set_announce(false);
    match &options.input {
        Some(path) => {
            let mut file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            feed(&mut file, &mut writer, options.chunk_size)?;
        }
        None => {
            let stdin = io::stdin();
            feed(&mut stdin.lock(), &mut writer, options.chunk_size)?;
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match options.format {
        OutputFormat::Html => {
            if options.stylesheet {
                writeln!(out, "<style>\n{}</style>", stylesheet(&config.get_color_scheme()))?;
            }
            writeln!(out, "{}", writer.render_document())?;
        }
        OutputFormat::Text => write!(out, "{}", writer.text())?,
        OutputFormat::Ansi => {
            TerminalRenderer::new(config.get_color_scheme()).render(&mut out, writer.console())?;
        }
    }
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chunk_keeps_split_character() {
        let bytes = "a✓b".as_bytes();
        let mut carry = Vec::new();
        assert_eq!(decode_chunk(&mut carry, &bytes[..2]), "a");
        assert_eq!(carry.len(), 1);
        assert_eq!(decode_chunk(&mut carry, &bytes[2..]), "✓b");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_feed_small_chunks() {
        let input = "\x1b[31m✓ pass\x1b[0m\nnext";
        let mut writer = ConsoleOutputWriter::default();
        assert_eq!(feed(&mut input.as_bytes(), &mut writer, 3).unwrap(), 1);
        assert_eq!(writer.text(), "✓ pass\nnext");
        assert_eq!(
            writer.render_html(),
            "<span class=\"xtermColor1\">✓ pass</span><span>\nnext</span>"
        );
    }

    #[test]
    fn test_feed_enforces_line_limit_while_reading() {
        let input: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let mut writer = ConsoleOutputWriter::default();
        writer.set_max_output_lines(Some(4));
        let peak = feed(&mut input.as_bytes(), &mut writer, 16).unwrap();
        assert!(peak <= 4);
        assert_eq!(writer.current_lines(), 4);
        assert_eq!(writer.text(), "line 46\nline 47\nline 48\nline 49\n");
    }
}
