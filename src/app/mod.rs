use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mapcss_conditions::config::InvalidRulePolicy;
use mapcss_conditions::model::DataSet;
use mapcss_conditions::pipeline::{MatchRecord, match_dataset};
use mapcss_conditions::rules::RuleSet;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input data set (JSON with nodes, ways, relations)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Style file (YAML)
    #[arg(short, long)]
    pub style: PathBuf,

    /// Output file (JSON lines), or - for stdout
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Override the style's on_invalid policy (skip or abort)
    #[arg(long)]
    pub on_invalid: Option<InvalidRulePolicy>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Writes one JSON object per line.
pub struct JsonlSink {
    writer: Box<dyn Write>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self> {
        let writer: Box<dyn Write> = if path == Path::new("-") {
            tracing::info!("Sink: jsonl -> stdout");
            Box::new(BufWriter::new(std::io::stdout()))
        } else {
            tracing::info!("Sink: jsonl -> {:?}", path);
            let file = File::create(path)
                .with_context(|| format!("CLI: Failed to create output {:?}", path))?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self { writer })
    }

    pub fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .context("CLI: Failed to serialize match record")?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("CLI: Failed to flush output")
    }
}

/// Load, match, write. Returns the number of matched primitives.
pub fn run(cli: &Cli) -> Result<u64> {
    let rules = RuleSet::load(&cli.style, cli.on_invalid)?;

    let dataset = DataSet::load(&cli.input)?;
    tracing::info!(
        "Data: {} nodes, {} ways, {} relations",
        dataset.nodes().len(),
        dataset.ways().len(),
        dataset.relations().len()
    );

    let records = match_dataset(&rules, &dataset);

    let mut sink = JsonlSink::open(&cli.output)?;
    for record in &records {
        sink.write_record(record)?;
    }
    sink.finish()?;

    Ok(records.len() as u64)
}
