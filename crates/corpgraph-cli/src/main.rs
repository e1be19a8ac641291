//! corpgraph CLI
//!
//! Usage:
//!   corpgraph build --config corpgraph.toml
//!   corpgraph build --kb kb.jsonl --registries registries.json \
//!     --entities lei2.xml.zip --relationships rr.xml.zip --output gleif.jsonl
//!   corpgraph extract rr.xml.zip --start "<rr:RelationshipRecord" \
//!     --end "</rr:RelationshipRecord>" --show 2

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use corpgraph::{Pipeline, PipelineConfig, PipelineError, RecordTags, RunReport, extract, with_input};

#[derive(Parser, Debug)]
#[command(name = "corpgraph")]
#[command(about = "Build knowledge-base linked organization records from GLEIF feeds")]
#[command(version)]
struct Cli {
    /// Log debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write the record file
    Build(BuildArgs),
    /// Count or show the records of one feed
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// TOML configuration file; flags override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Knowledge-base export (JSON lines)
    #[arg(long)]
    kb: Option<PathBuf>,

    /// Business registry table (JSON)
    #[arg(long)]
    registries: Option<PathBuf>,

    /// Level 1 entity feed
    #[arg(long)]
    entities: Option<PathBuf>,

    /// Level 2 relationship feed
    #[arg(long)]
    relationships: Option<PathBuf>,

    /// Output record file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Record blocks decoded per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Cap on items visited by one containment closure
    #[arg(long)]
    max_closure_items: Option<usize>,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Feed to read (zip archive or plain XML)
    input: PathBuf,

    /// Prefix of the line that opens a record
    #[arg(long, default_value = "<lei:LEIRecord")]
    start: String,

    /// Line that closes a record
    #[arg(long, default_value = "</lei:LEIRecord>")]
    end: String,

    /// Print the first N records
    #[arg(long, default_value_t = 0)]
    show: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Build(args) => handle_build(&args),
        Command::Extract(args) => handle_extract(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PipelineError>() {
                Some(pipeline_err) => eprintln!("Error: {}", pipeline_err.user_message()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_build(args: &BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::new(),
    };
    if let Some(path) = &args.kb {
        config = config.with_kb(path);
    }
    if let Some(path) = &args.registries {
        config = config.with_registries(path);
    }
    if let Some(path) = &args.entities {
        config = config.with_entities(path);
    }
    if let Some(path) = &args.relationships {
        config = config.with_relationships(path);
    }
    if let Some(path) = &args.output {
        config = config.with_output(path);
    }
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(max) = args.max_closure_items {
        config = config.with_max_closure_items(max);
    }

    tracing::debug!(?config, "Effective configuration");
    let report = Pipeline::new(config)?.run()?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing run report")?
        );
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn handle_extract(args: &ExtractArgs) -> Result<()> {
    let tags = RecordTags::new(args.start.clone(), args.end.clone());
    let count = with_input(&args.input, |reader| {
        let mut count = 0usize;
        for block in extract(reader, tags) {
            let block = block?;
            if count < args.show {
                println!("--- record at line {} ---", block.line);
                println!("{}", String::from_utf8_lossy(block.as_bytes()).trim_end());
            }
            count += 1;
        }
        Ok(count)
    })?;
    eprintln!("{} records in {}", thousands(count), args.input.display());
    Ok(())
}

fn print_summary(report: &RunReport) {
    eprintln!();
    eprintln!("Pipeline Summary");
    eprintln!("================");
    eprintln!("Companies:              {}", thousands(report.companies));
    eprintln!("Rejected records:       {}", thousands(report.entities.rejected));
    eprintln!("Duplicate records:      {}", thousands(report.duplicate_records));
    if let Some(graph) = &report.relationships {
        eprintln!("Relationships applied:  {}", thousands(graph.applied));
        eprintln!("  direct:               {}", thousands(graph.direct));
        eprintln!("  indirect:             {}", thousands(graph.indirect));
        eprintln!("Edges skipped:          {}", thousands(graph.skipped()));
        eprintln!("Invalid relationships:  {}", thousands(graph.invalid));
        for (label, count) in &graph.unknown_types {
            eprintln!("Unknown relationship {label}: {} edges", thousands(*count));
        }
    }
    for (code, count) in &report.entities.unknown_authorities {
        eprintln!("Unknown RA {code}: {} companies", thousands(*count));
    }
    for (category, count) in &report.entities.unknown_categories {
        eprintln!("Unknown category {category}: {} companies", thousands(*count));
    }
    eprintln!("Output:                 {}", report.output.display());
    eprintln!("Duration:               {}ms", thousands(report.duration_ms as usize));
}

/// Format with comma thousand separators
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
