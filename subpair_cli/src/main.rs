use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use subpair_common::{ensure_config, load_config, AppConfig, FileKind, LoadedConfig, Side};
use subpair_core::encoding;
use subpair_core::{DocumentExporter, DocumentImporter, EncodingResolver, PairMatcher, PairPlan};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "subpair")]
#[command(author = "Subpair Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Pair parallel subtitle files into a Word table and back", long_about = None)]
struct Cli {
    /// Use the config file next to the executable
    #[arg(long, global = true)]
    portable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export matched file pairs into one two-column Word document
    Export {
        /// Side A files, or a single folder
        #[arg(long = "side-a", required = true, num_args = 1..)]
        side_a: Vec<PathBuf>,

        /// Side B files, or a single folder
        #[arg(long = "side-b", required = true, num_args = 1..)]
        side_b: Vec<PathBuf>,

        /// Output document path
        #[arg(short, long)]
        output: PathBuf,

        /// File type in folder mode (inferred from side A when omitted)
        #[arg(long)]
        ext: Option<FileKind>,

        /// Decode every side B file with this encoding instead of detecting it
        #[arg(long = "side-b-encoding")]
        side_b_encoding: Option<String>,

        /// Do not write `<output stem>_log.txt`
        #[arg(long)]
        no_run_log: bool,
    },

    /// Split a Word document back into two folders
    Import {
        /// Document produced by `export`
        document: PathBuf,

        /// Destination folder for side A files
        #[arg(long = "side-a-out")]
        side_a_out: PathBuf,

        /// Destination folder for side B files
        #[arg(long = "side-b-out")]
        side_b_out: PathBuf,

        /// Replace existing files instead of adding `_1`, `_2`, ... suffixes
        #[arg(long)]
        overwrite: bool,

        /// Do not write `<document stem>_import_log.txt`
        #[arg(long)]
        no_run_log: bool,
    },

    /// Report which basenames pair up without exporting anything
    Pairs {
        /// Side A files, or a single folder
        #[arg(long = "side-a", required = true, num_args = 1..)]
        side_a: Vec<PathBuf>,

        /// Side B files, or a single folder
        #[arg(long = "side-b", required = true, num_args = 1..)]
        side_b: Vec<PathBuf>,

        /// File type in folder mode (inferred from side A when omitted)
        #[arg(long)]
        ext: Option<FileKind>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the encoding each file would be decoded with
    Detect {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Fallback label when detection has no answer (defaults to the side A encoding)
        #[arg(long)]
        default: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where the config file lives
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Export { .. } => "Export",
            Commands::Import { .. } => "Import",
            Commands::Pairs { .. } => "Pairs",
            Commands::Detect { .. } => "Detect",
            Commands::Config { .. } => "Config",
        }
    }

    /// Plain-text log written next to the artifact, if this run keeps one
    fn run_log_path(&self, config: &AppConfig) -> Option<PathBuf> {
        if !config.write_run_log {
            return None;
        }

        match self {
            Commands::Export {
                output, no_run_log, ..
            } if !no_run_log => Some(sibling_with_suffix(output, "_log.txt")),
            Commands::Import {
                document,
                no_run_log,
                ..
            } if !no_run_log => Some(sibling_with_suffix(document, "_import_log.txt")),
            _ => None,
        }
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

fn main() {
    let cli = Cli::parse();

    let loaded = match cli.command {
        Commands::Config { init: true } => ensure_config(cli.portable),
        _ => load_config(cli.portable),
    };
    let run_log = loaded
        .as_ref()
        .ok()
        .and_then(|l| cli.command.run_log_path(&l.config));

    // Tracing goes to stderr (so JSON output can go cleanly to stdout)
    let run_log_error = init_tracing(run_log.as_deref()).err();
    if let (Some(path), Some(e)) = (&run_log, run_log_error) {
        warn!("Run log {} disabled: {}", path.display(), e);
    }

    let loaded = match loaded {
        Ok(loaded) => {
            if loaded.exists {
                info!("Using config {}", loaded.path.display());
            }
            loaded
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let name = cli.command.name();
    if let Commands::Config { .. } = cli.command {
        print_config(&loaded);
        return;
    }

    let config = loaded.config;
    let result = match cli.command {
        Commands::Export {
            side_a,
            side_b,
            output,
            ext,
            side_b_encoding,
            ..
        } => run_export(config, side_a, side_b, output, ext, side_b_encoding),
        Commands::Import {
            document,
            side_a_out,
            side_b_out,
            overwrite,
            ..
        } => run_import(config, document, side_a_out, side_b_out, overwrite),
        Commands::Pairs {
            side_a,
            side_b,
            ext,
            json,
        } => run_pairs(config, side_a, side_b, ext, json),
        Commands::Detect {
            files,
            default,
            json,
        } => run_detect(config, files, default, json),
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = result {
        error!("{} failed: {:#}", name, e);
        std::process::exit(1);
    }
}

/// Install the stderr subscriber, plus an ANSI-free file layer when a run log is wanted.
///
/// If the run log cannot be created the stderr layer is still installed and
/// the error is returned so the caller can report it.
fn init_tracing(run_log: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, result) = match run_log.map(File::create) {
        Some(Ok(file)) => (Some(file), Ok(())),
        Some(Err(e)) => (None, Err(e)),
        None => (None, Ok(())),
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    result
}

fn print_config(loaded: &LoadedConfig) {
    println!("{}", loaded.path.display());
    println!("  Exists:   {}", loaded.exists);
    println!("  Portable: {}", loaded.portable);
}

fn progress_bar(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("=> "));
    bar.set_message(message);
    bar
}

/// One directory on each side selects folder mode; anything else is an explicit list
fn build_plan(
    config: &AppConfig,
    side_a: &[PathBuf],
    side_b: &[PathBuf],
    ext: Option<FileKind>,
) -> anyhow::Result<PairPlan> {
    let matcher = PairMatcher::new(config);

    let plan = match (side_a, side_b) {
        ([a], [b]) if a.is_dir() && b.is_dir() => {
            info!("Folder mode:");
            info!("  Side A: {}", a.display());
            info!("  Side B: {}", b.display());
            matcher.from_folders(a, b, ext)?
        }
        _ => {
            if side_a.iter().chain(side_b).any(|p| p.is_dir()) {
                bail!("Folders must be given alone: one folder per side, or files only");
            }
            let plan = matcher.from_paths(side_a, side_b)?;
            if let Some(ext) = ext.filter(|ext| *ext != plan.kind) {
                warn!(
                    "Ignoring --ext {} for an explicit list of .{} files",
                    ext, plan.kind
                );
            }
            plan
        }
    };

    Ok(plan)
}

fn run_export(
    config: AppConfig,
    side_a: Vec<PathBuf>,
    side_b: Vec<PathBuf>,
    output: PathBuf,
    ext: Option<FileKind>,
    side_b_encoding: Option<String>,
) -> anyhow::Result<()> {
    let force = side_b_encoding.or_else(|| config.side_b_force_encoding.clone());
    if let Some(label) = &force {
        encoding::require(label)?;
    }

    let plan = build_plan(&config, &side_a, &side_b, ext)?;

    let bar = progress_bar("files");
    bar.set_length(plan.paired.len() as u64);
    let mut on_progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };

    let summary = DocumentExporter::new(&config)
        .export(&plan, &output, force.as_deref(), Some(&mut on_progress))
        .with_context(|| format!("Failed to export {}", output.display()))?;
    bar.finish_and_clear();

    println!("\n{}", "=".repeat(80));
    println!("Exported {}", summary.output.display());
    println!("{}", "=".repeat(80));
    println!("  File type: {}", summary.kind);
    println!("  Sections:  {}", summary.sections);
    println!("  Rows:      {}", summary.rows);
    for warning in &summary.warnings {
        println!("  {}", warning);
    }
    println!("{}", "=".repeat(80));

    Ok(())
}

fn run_import(
    config: AppConfig,
    document: PathBuf,
    side_a_out: PathBuf,
    side_b_out: PathBuf,
    overwrite: bool,
) -> anyhow::Result<()> {
    info!("Importing {}", document.display());

    let bar = progress_bar("sections");
    let mut on_progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };

    let summary = DocumentImporter::new(&config)
        .import(
            &document,
            &side_a_out,
            &side_b_out,
            overwrite || config.overwrite,
            Some(&mut on_progress),
        )
        .with_context(|| format!("Failed to import {}", document.display()))?;
    bar.finish_and_clear();

    println!("\n{}", "=".repeat(80));
    println!("Imported {} ({} files)", document.display(), summary.kind);
    println!("{}", "=".repeat(80));
    for pair in &summary.written {
        println!(
            "  {:<40} {:>6} lines  -> {} | {}",
            pair.basename,
            pair.lines,
            pair.side_a.display(),
            pair.side_b.display()
        );
    }
    println!("{}", "=".repeat(80));
    println!("Summary:");
    println!(
        "  File type: {} ({})",
        summary.kind,
        if summary.declared { "declared" } else { "assumed" }
    );
    println!("  Markers:  {}", summary.detection);
    println!("  Sections: {}", summary.written.len());
    println!(
        "  Lines:    {}",
        summary.written.iter().map(|p| p.lines).sum::<usize>()
    );

    Ok(())
}

#[derive(Serialize)]
struct PairsReport {
    kind: FileKind,
    paired: Vec<String>,
    missing_on_a: Vec<String>,
    missing_on_b: Vec<String>,
}

impl PairsReport {
    fn new(plan: &PairPlan) -> Self {
        Self {
            kind: plan.kind,
            paired: plan.paired.clone(),
            missing_on_a: plan.missing_on_a.iter().cloned().collect(),
            missing_on_b: plan.missing_on_b.iter().cloned().collect(),
        }
    }
}

fn run_pairs(
    config: AppConfig,
    side_a: Vec<PathBuf>,
    side_b: Vec<PathBuf>,
    ext: Option<FileKind>,
    json: bool,
) -> anyhow::Result<()> {
    let plan = build_plan(&config, &side_a, &side_b, ext)?;

    if json {
        let output = serde_json::to_string_pretty(&PairsReport::new(&plan))?;
        println!("{output}");
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("Pairs ({} files)", plan.kind);
    println!("{}", "=".repeat(80));
    for name in &plan.paired {
        println!("  [==] {}", name);
    }
    for name in &plan.missing_on_b {
        println!("  [A ] {}", name);
    }
    for name in &plan.missing_on_a {
        println!("  [ B] {}", name);
    }
    println!("{}", "=".repeat(80));
    println!("Summary:");
    println!("  Paired:            {}", plan.paired.len());
    println!("  Missing on {}: {}", Side::B, plan.missing_on_b.len());
    println!("  Missing on {}: {}", Side::A, plan.missing_on_a.len());

    Ok(())
}

#[derive(Serialize)]
struct DetectEntry {
    path: String,
    encoding: String,
    detected: bool,
}

fn run_detect(
    config: AppConfig,
    files: Vec<PathBuf>,
    default: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let default = encoding::require(default.as_deref().unwrap_or(&config.side_a_encoding))?;
    let resolver = EncodingResolver::new(config.detection_sample_size);

    let mut entries = Vec::with_capacity(files.len());
    for path in &files {
        if !path.is_file() {
            bail!("Path is not a file: {}", path.display());
        }
        let detected = resolver
            .detect(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        entries.push(DetectEntry {
            path: path.display().to_string(),
            encoding: detected.unwrap_or(default).name().to_string(),
            detected: detected.is_some(),
        });
    }

    if json {
        let output = serde_json::to_string_pretty(&entries)?;
        println!("{output}");
        return Ok(());
    }

    for entry in &entries {
        let source = if entry.detected { "detected" } else { "default" };
        println!("{}\t{} ({})", entry.path, entry.encoding, source);
    }

    Ok(())
}
