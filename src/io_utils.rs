//! I/O utilities: loading input text, encoding resolution and output sinks.
//!
//! Inputs are read fully into memory and decoded with `encoding_rs`
//! (UTF-8 unless a label is given; a byte-order mark overrides the label).
//! The `-` path routes through stdin/stdout.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("Failed to decode text with encoding {}", used.name()))
    } else {
        Ok(text.into_owned())
    }
}

/// Reads the whole input (file or stdin) and decodes it to text.
pub fn read_input(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = if is_dash(path) {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("Reading input from stdin")?;
        buf
    } else {
        fs::read(path).with_context(|| format!("Opening input file {path:?}"))?
    };
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

/// Name used for an input in reports and history records.
pub fn display_name(path: &Path) -> String {
    if is_dash(path) {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    let mut writer = open_output(path)?;
    writer
        .write_all(contents.as_bytes())
        .context("Writing output")?;
    if !contents.ends_with('\n') {
        writer.write_all(b"\n").context("Writing output")?;
    }
    writer.flush().context("Flushing output")
}

pub fn open_csv_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let mut builder = csv::WriterBuilder::new();
    builder.quote_style(QuoteStyle::Always).double_quote(true);
    Ok(builder.from_writer(open_output(path)?))
}
