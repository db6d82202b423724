use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use farscribe::export_format::ExportFormat;
use farscribe::segments::Transcript;
use farscribe::{export, import, search};

/// Re-serialize a transcript between interchange formats, optionally
/// filtering segments by a search query first.
#[derive(Parser, Debug)]
#[command(name = "farscribe")]
#[command(about = "Convert transcripts between TXT, SRT, VTT, JSON, and TSV")]
struct Params {
    /// Input transcript file, or `-` for stdin.
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Input format. Inferred from the file extension when omitted.
    #[arg(long = "from", value_enum)]
    from: Option<ExportFormat>,

    /// Output format.
    #[arg(short = 'o', long = "output-type", value_enum, default_value_t = ExportFormat::Vtt)]
    output_type: ExportFormat,

    /// Keep only segments whose text contains this query (case-insensitive).
    #[arg(short = 'q', long = "query")]
    query: Option<String>,
}

fn main() -> Result<()> {
    farscribe::logging::init();
    let params = Params::parse();

    let content = read_input(&params.input)?;
    let from = input_format(&params)?;
    let transcript = import::parse(&content, from)
        .with_context(|| format!("failed to parse '{}' as {from}", params.input))?;

    let transcript = match params.query.as_deref() {
        Some(query) => filter(&transcript, query)?,
        None => transcript,
    };

    let exported = export::export(&transcript, params.output_type);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(exported.content.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read '{input}'"))
}

fn input_format(params: &Params) -> Result<ExportFormat> {
    if let Some(from) = params.from {
        return Ok(from);
    }
    let extension = Path::new(&params.input)
        .extension()
        .and_then(|ext| ext.to_str());
    match extension {
        Some(ext) => ext
            .parse::<ExportFormat>()
            .with_context(|| format!("cannot infer input format from '.{ext}'; pass --from")),
        None => bail!("cannot infer input format for '{}'; pass --from", params.input),
    }
}

fn filter(transcript: &Transcript, query: &str) -> Result<Transcript> {
    let matched: Vec<_> = search::search(transcript.segments(), query)
        .into_iter()
        .cloned()
        .collect();
    // Filtering preserves order and non-overlap, so revalidation cannot fail.
    Ok(Transcript::new(matched)?)
}
