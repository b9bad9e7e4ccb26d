use anyhow::{Context, Result};
use bytes::Bytes;
use std::io::{BufWriter, Read, Write};

use crate::cli::TransformArgs;
use crate::decode::decode_logs_request;
use crate::native;
use crate::transform::LogsTransformer;

pub fn execute_transform(args: TransformArgs) -> Result<()> {
    native::init_tracing(false);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let count = if args.input.as_os_str() == "-" {
        transform_reader(std::io::stdin().lock(), args.max_value_depth, &mut out)?
    } else {
        let file = std::fs::File::open(&args.input)
            .with_context(|| format!("Failed to open {}", args.input.display()))?;
        transform_reader(file, args.max_value_depth, &mut out)?
    };
    out.flush()?;

    tracing::info!(records = count, "transform complete");
    Ok(())
}

/// Flatten one OTLP/JSON logs document (gzip is detected from the magic
/// bytes) and write one JSON record per line. Returns the record count.
pub fn transform_reader(
    mut input: impl Read,
    max_value_depth: usize,
    out: &mut impl Write,
) -> Result<usize> {
    let mut body = Vec::new();
    input.read_to_end(&mut body).context("Failed to read input")?;

    let request = decode_logs_request(Bytes::from(body), None)?;
    let records = LogsTransformer::new()
        .with_max_value_depth(max_value_depth)
        .transform(&request);

    for record in &records {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    Ok(records.len())
}
