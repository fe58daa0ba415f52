//! Command line front end for merging deployment descriptors.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use descriptor_merge::{
    parse_file, DescriptorMergerByTag, DescriptorSchema, DocumentMerger, DocumentMergerByXslt,
    DocumentStreamAdapter, MergeConfig, MergeElement, MergeOutput, MergeProcessor, StrategyEntry,
    XsltProc,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Merge XML deployment descriptors tag by tag.
#[derive(Parser)]
#[command(name = "dmerge")]
#[command(version)]
#[command(about = "Merge XML deployment descriptors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold descriptors left to right into one
    #[command(visible_alias = "m")]
    Merge(MergeOptions),

    /// Show how the elements of one tag are matched between two descriptors
    #[command(visible_alias = "c")]
    Classify(ClassifyOptions),
}

#[derive(Args)]
struct MergeOptions {
    /// Descriptors to merge; later files win conflicts under overwrite
    #[arg(required = true, value_name = "input")]
    inputs: Vec<PathBuf>,

    /// Merge configuration file (TOML)
    #[arg(short, long, value_name = "file")]
    config: Option<PathBuf>,

    /// Schema preset (web-app, application)
    #[arg(short, long)]
    schema: Option<String>,

    /// Strategy for tags without their own
    #[arg(short, long, value_name = "strategy")]
    default: Option<String>,

    /// Strategy for one tag, as tag=strategy
    #[arg(short = 't', long = "tag", value_name = "tag=strategy", value_parser = parse_tag_strategy)]
    tags: Vec<(String, String)>,

    /// Merge with this stylesheet instead of the tag merger
    #[arg(long, value_name = "stylesheet", conflicts_with_all = ["config", "default", "tags"])]
    xslt: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "file")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ClassifyOptions {
    /// Base descriptor
    left: PathBuf,

    /// Descriptor merged into the base
    right: PathBuf,

    /// Schema preset (web-app, application)
    #[arg(short, long, default_value = "web-app")]
    schema: String,

    /// Tag to classify
    #[arg(long)]
    tag: String,
}

fn parse_tag_strategy(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((tag, strategy)) if !tag.is_empty() && !strategy.is_empty() => {
            Ok((tag.trim().to_string(), strategy.trim().to_string()))
        }
        _ => Err(format!("expected tag=strategy, got '{}'", value)),
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    match Cli::parse().command {
        Commands::Merge(opts) => run_merge(opts),
        Commands::Classify(opts) => run_classify(opts),
    }
}

fn run_merge(opts: MergeOptions) -> Result<()> {
    let output = match &opts.xslt {
        Some(stylesheet) => {
            info!(stylesheet = %stylesheet.display(), "merging by stylesheet");
            let processor = DocumentMergerByXslt::new(XsltProc::new(stylesheet));
            merge_files(DocumentStreamAdapter::new(processor), &opts.inputs)?
        }
        None => {
            let config = merge_config(&opts)?;
            let merger = config.build_merger().context("invalid merge configuration")?;
            info!(schema = merger.schema().name(), inputs = opts.inputs.len(), "merging");
            merge_files(
                DocumentStreamAdapter::new(DocumentMerger::new(merger)),
                &opts.inputs,
            )?
        }
    };

    let mut writer: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };
    writer.write_all(&output)?;
    writer.flush()?;
    Ok(())
}

/// Combines the configuration file with command line overrides.
fn merge_config(opts: &MergeOptions) -> Result<MergeConfig> {
    let mut config = match &opts.config {
        Some(path) => MergeConfig::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => MergeConfig::default(),
    };
    if let Some(schema) = &opts.schema {
        config.schema = Some(schema.clone());
    }
    if config.schema.is_none() && config.tags.is_empty() {
        config.schema = Some("web-app".to_string());
    }
    if let Some(default) = &opts.default {
        config.default = Some(StrategyEntry::Name(default.clone()));
    }
    for (tag, strategy) in &opts.tags {
        config
            .strategies
            .insert(tag.clone(), StrategyEntry::Name(strategy.clone()));
    }
    Ok(config)
}

fn merge_files<P: MergeProcessor>(
    mut processor: DocumentStreamAdapter<P>,
    inputs: &[PathBuf],
) -> Result<Vec<u8>> {
    for input in inputs {
        add_input(&mut processor, input)?;
    }
    match processor.perform_merge()? {
        Some(MergeOutput::Bytes(bytes)) => Ok(bytes),
        Some(MergeOutput::Document(_)) | None => Err(anyhow!("merge produced no output")),
    }
}

fn add_input<P: MergeProcessor>(
    processor: &mut DocumentStreamAdapter<P>,
    path: &Path,
) -> Result<()> {
    processor
        .add_file(path)
        .with_context(|| format!("cannot read descriptor {}", path.display()))
}

fn run_classify(opts: ClassifyOptions) -> Result<()> {
    let schema = DescriptorSchema::preset(&opts.schema)?;
    let left = parse_file(&opts.left)
        .with_context(|| format!("cannot parse {}", opts.left.display()))?;
    let right = parse_file(&opts.right)
        .with_context(|| format!("cannot parse {}", opts.right.display()))?;

    let merger = DescriptorMergerByTag::new(schema);
    let Some(set) = merger.classify(&opts.tag, &left, &right) else {
        bail!("schema '{}' has no tag '{}'", opts.schema, opts.tag);
    };

    let mut out = io::stdout().lock();
    if set.is_concatenation() {
        writeln!(out, "# <{}> has no identifier; right elements are appended", opts.tag)?;
    }
    write_bucket(&mut out, "left-only", set.left_only().iter())?;
    write_bucket(&mut out, "right-only", set.right_only().iter())?;
    write_bucket(&mut out, "both", set.both().iter().map(|pair| pair.left()))?;
    Ok(())
}

fn write_bucket<'a>(
    out: &mut impl Write,
    label: &str,
    items: impl ExactSizeIterator<Item = &'a MergeElement>,
) -> Result<()> {
    writeln!(out, "{} ({}):", label, items.len())?;
    for item in items {
        writeln!(out, "  {}", item.identity())?;
    }
    Ok(())
}
