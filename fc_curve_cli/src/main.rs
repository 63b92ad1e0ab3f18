use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use fc_curve::{
    is_excluded, process_batch, CurveMetadata, CurveStore, DirSource, Params, ProcessedCurve,
    Registry, SourceFile,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ")"
);

const REGISTRY_FILE: &str = "registry.json";
const CURVES_DIR: &str = "curves";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = LONG_VERSION,
    about = "Switch force curve feature extraction CLI",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract curves and metadata from raw force-curve captures
    Extract(ExtractArgs),
    /// Print the stored curve record for one registry key
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Capture files or directories (searched recursively for .csv)
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Output directory for registry.json and per-key curve records
    #[arg(short, long, default_value = "force-curves", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Optional CSV summary table (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    table: Option<PathBuf>,

    /// Leading lines to skip before the column header row
    #[arg(long, default_value_t = 5)]
    header_lines: usize,

    /// Header prefix identifying the displacement column
    #[arg(long, default_value = "displacement")]
    displacement_column: String,

    /// Header prefix identifying the force column
    #[arg(long, default_value = "force")]
    force_column: String,

    /// Skip files whose name contains this pattern (case-insensitive)
    #[arg(long, default_value = "HighResolutionRaw")]
    exclude_pattern: String,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Registry key, e.g. `cherry-mx-black`
    key: String,

    /// Directory previously written by `extract`
    #[arg(short, long, default_value = "force-curves", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl ExtractArgs {
    fn params(&self) -> Params {
        Params {
            header_lines: self.header_lines,
            displacement_column: self.displacement_column.clone(),
            force_column: self.force_column.clone(),
            exclude_pattern: self.exclude_pattern.clone(),
        }
    }
}

struct ExtractSummary {
    files: usize,
    registered: usize,
    collisions: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Extract(args) => args.verbose,
        Command::Show(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Extract(args) => handle_extract(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_extract(args: ExtractArgs) -> Result<()> {
    let params = args.params();
    params.validate()?;

    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(anyhow!("--threads must be at least 1"));
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker pool")?;
    }

    let summary = run_extract(&args, &params)?;
    info!(
        "Extracted {} files: {} registry entries, {} key collisions",
        summary.files, summary.registered, summary.collisions
    );
    Ok(())
}

fn run_extract(args: &ExtractArgs, params: &Params) -> Result<ExtractSummary> {
    let t_scan = Instant::now();
    let paths = collect_inputs(&args.inputs, params)?;
    if paths.is_empty() {
        warn!("No capture files found under the given inputs");
    }
    if args.profile || args.verbose {
        info!(
            "Scan stage: {:.1} ms ({} files)",
            t_scan.elapsed().as_secs_f64() * 1000.0,
            paths.len()
        );
    }

    let t_read = Instant::now();
    let sources: Vec<SourceFile> = paths.par_iter().map(|path| read_source(path)).collect();
    if args.profile || args.verbose {
        info!(
            "Read stage: {:.1} ms",
            t_read.elapsed().as_secs_f64() * 1000.0
        );
    }

    let t_compute = Instant::now();
    let curves = process_batch(&sources, params);
    let registry = Registry::from_processed(&curves);
    if args.profile || args.verbose {
        info!(
            "Compute stage: {:.1} ms ({} curves)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            curves.len()
        );
    }

    let t_write = Instant::now();
    write_outputs(&args.out_dir, &curves, &registry)?;
    info!("Wrote registry: {}", args.out_dir.join(REGISTRY_FILE).display());

    if let Some(table) = args.table.as_ref() {
        if table.as_os_str() == "-" {
            write_table_stdout(&registry)?;
        } else {
            write_table_csv(&registry, table)?;
            info!("Wrote summary table: {}", table.display());
        }
    }
    if args.profile || args.verbose {
        info!(
            "Write stage: {:.1} ms",
            t_write.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(ExtractSummary {
        files: sources.len(),
        registered: registry.len(),
        collisions: registry.collisions().len(),
    })
}

/// Expand inputs into a sorted, de-duplicated list of capture files.
fn collect_inputs(inputs: &[PathBuf], params: &Params) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk_dir(input, &mut found)?;
        } else if input.exists() {
            found.push(input.clone());
        } else {
            return Err(anyhow!("input not found: {}", input.display()));
        }
    }
    found.retain(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_excluded(&name, params) {
            debug!("Skipping excluded capture {}", path.display());
            false
        } else {
            true
        }
    });
    found.sort();
    found.dedup();
    Ok(found)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if has_csv_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

/// Unreadable files degrade to empty text so one bad capture never aborts the batch.
fn read_source(path: &Path) -> SourceFile {
    let identity = path.to_string_lossy().into_owned();
    let text = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            warn!("Failed to read {}: {}", path.display(), err);
            String::new()
        }
    };
    SourceFile::new(identity, text)
}

fn write_outputs(out_dir: &Path, curves: &[ProcessedCurve], registry: &Registry) -> Result<()> {
    let curves_dir = out_dir.join(CURVES_DIR);
    fs::create_dir_all(&curves_dir)
        .with_context(|| format!("failed to create {}", curves_dir.display()))?;
    let removed = clear_records(&curves_dir)?;
    if removed > 0 {
        debug!("Removed {} stale curve records", removed);
    }

    // Only the registered owner of each key gets a record.
    for curve in curves
        .iter()
        .filter(|c| registry.source_of(&c.key) == Some(c.source.as_str()))
    {
        let path = curves_dir.join(format!("{}.json", curve.key));
        let text = serde_json::to_string_pretty(curve)?;
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let path = out_dir.join(REGISTRY_FILE);
    let text = serde_json::to_string_pretty(registry.entries())?;
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn clear_records(dir: &Path) -> Result<usize> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut removed = 0;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let is_record = path.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_record {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn write_table_stdout(registry: &Registry) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_table_rows(registry, &mut writer)
}

fn write_table_csv(registry: &Registry, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_table_rows(registry, &mut writer)
}

fn write_table_rows<W: Write>(registry: &Registry, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "key",
        "bottom_out_x",
        "bottom_out_force",
        "tactile_max_x",
        "tactile_max_force",
        "tactile_min_x",
        "tactile_min_force",
        "is_tactile",
    ])?;
    for (key, meta) in registry.entries() {
        writer.write_record([
            key.clone(),
            meta.bottom_out.x.to_string(),
            meta.bottom_out.y.to_string(),
            meta.tactile_max.x.to_string(),
            meta.tactile_max.y.to_string(),
            meta.tactile_min.x.to_string(),
            meta.tactile_min.y.to_string(),
            meta.is_tactile.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn load_registry(out_dir: &Path) -> Result<Registry> {
    let path = out_dir.join(REGISTRY_FILE);
    let text =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let entries: BTreeMap<String, CurveMetadata> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Registry::from_entries(entries))
}

fn handle_show(args: ShowArgs) -> Result<()> {
    let curve = lookup_curve(&args.out_dir, &args.key)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &curve)?;
    writeln!(handle)?;
    Ok(())
}

fn lookup_curve(out_dir: &Path, key: &str) -> Result<ProcessedCurve> {
    let registry = load_registry(out_dir)?;
    let mut store = CurveStore::new(DirSource::new(out_dir.join(CURVES_DIR)), &registry);
    let curve = store
        .get(key)
        .with_context(|| format!("lookup of '{}' in {} failed", key, out_dir.display()))?;
    Ok(curve.as_ref().clone())
}
