use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use anchor_splice::{
    apply_all, check_all, diagnose, load_from_path, runner, ApplicationError, BoundaryPattern,
    Document, DocumentSink, FileSink, LocateError, Marker, PatchOutcome, PatchRequest,
    PatchStatus, RunError, RunReport,
};

/// Exit code when a marker or boundary pattern fails to match.
const EXIT_NOT_FOUND: i32 = 1;
/// Exit code when the sink (or a payload/patch-set file) cannot be read or
/// written.
const EXIT_IO: i32 = 2;

#[derive(Parser)]
#[command(name = "anchor-splice")]
#[command(about = "Structural text patching with literal anchors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a payload immediately before a literal marker
    Insert {
        /// Literal marker to anchor on
        #[arg(short, long)]
        marker: String,

        #[command(flatten)]
        payload: PayloadArgs,

        /// File to patch
        #[arg(short, long)]
        target: PathBuf,

        /// Skip the insert when the payload already precedes the marker
        #[arg(short, long)]
        guard: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replace from a start marker up to a boundary pattern
    Replace {
        /// Literal start marker
        #[arg(short, long)]
        start: String,

        /// Regex locating the end of the region; its matched text is
        /// preserved after the payload
        #[arg(short, long)]
        boundary_pattern: String,

        #[command(flatten)]
        payload: PayloadArgs,

        /// File to patch
        #[arg(short, long)]
        target: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Apply every patch in a patch set
    Apply {
        /// Root directory that patch targets resolve against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Specific patch set to apply (otherwise all in <root>/patches/)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check patch-set status without writing anything
    Status {
        /// Root directory that patch targets resolve against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Specific patch set to check (otherwise all in <root>/patches/)
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PayloadArgs {
    /// Inline payload text
    #[arg(long)]
    payload: Option<String>,

    /// Read the payload from a file
    #[arg(long)]
    payload_file: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Show what would change without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Insert {
            marker,
            payload,
            target,
            guard,
            output,
        } => cmd_insert(marker, payload, target, guard, output),

        Commands::Replace {
            start,
            boundary_pattern,
            payload,
            target,
            output,
        } => cmd_replace(start, boundary_pattern, payload, target, output),

        Commands::Apply {
            root,
            patches,
            output,
        } => cmd_apply(root, patches, output),

        Commands::Status { root, patches } => cmd_status(root, patches),
    };

    std::process::exit(code);
}

fn read_payload(args: &PayloadArgs) -> Result<String> {
    match (&args.payload, &args.payload_file) {
        (Some(inline), None) => Ok(inline.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read payload {}: {}", path.display(), e)),
        _ => unreachable!("clap group enforces exactly one payload source"),
    }
}

fn cmd_insert(
    marker: String,
    payload: PayloadArgs,
    target: PathBuf,
    guard: bool,
    output: OutputArgs,
) -> i32 {
    let payload = match read_payload(&payload) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return EXIT_IO;
        }
    };

    let marker = match Marker::new(marker) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return EXIT_NOT_FOUND;
        }
    };

    run_single(&PatchRequest::Insert { marker, payload }, &target, guard, &output)
}

fn cmd_replace(
    start: String,
    boundary_pattern: String,
    payload: PayloadArgs,
    target: PathBuf,
    output: OutputArgs,
) -> i32 {
    let payload = match read_payload(&payload) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return EXIT_IO;
        }
    };

    let request = match Marker::new(start).and_then(|start| {
        Ok(PatchRequest::Replace {
            start,
            boundary: BoundaryPattern::new(boundary_pattern)?,
            payload,
        })
    }) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return EXIT_NOT_FOUND;
        }
    };

    run_single(&request, &target, false, &output)
}

/// Drive one request against one file sink.
fn run_single(request: &PatchRequest, target: &Path, guard: bool, output: &OutputArgs) -> i32 {
    let mut sink = FileSink::new(target);

    // Read up front: dry runs and diffs need the before-image, and a failed
    // match wants the document for near-miss context.
    let before = match sink.read() {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return EXIT_IO;
        }
    };

    if output.dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
        let outcome = if guard {
            request.apply_guarded(&before)
        } else {
            request.apply(&before)
        };
        return match outcome {
            Ok(PatchOutcome::Applied { document, span }) => {
                println!(
                    "{} {}: would patch bytes [{}, {})",
                    "✓".green(),
                    target.display(),
                    span.start,
                    span.end
                );
                if output.diff {
                    display_diff(target, before.as_str(), document.as_str());
                }
                0
            }
            Ok(PatchOutcome::AlreadyApplied { .. }) => {
                println!("{} {}: already applied", "⊙".yellow(), target.display());
                0
            }
            Err(e) => {
                report_locate_failure(&e, &before);
                EXIT_NOT_FOUND
            }
        };
    }

    let result = if guard {
        runner::run_guarded(&mut sink, request)
    } else {
        runner::run(&mut sink, request)
    };

    match result {
        Ok(RunReport::Patched { span }) => {
            println!(
                "{} {}: patched bytes [{}, {})",
                "✓".green(),
                target.display(),
                span.start,
                span.end
            );
            if output.diff {
                if let Ok(after) = fs::read_to_string(target) {
                    display_diff(target, before.as_str(), &after);
                }
            }
            0
        }
        Ok(RunReport::AlreadyApplied) => {
            println!("{} {}: already applied", "⊙".yellow(), target.display());
            0
        }
        Err(RunError::Locate(e)) => {
            report_locate_failure(&e, &before);
            EXIT_NOT_FOUND
        }
        Err(RunError::Sink(e)) => {
            eprintln!("{} {}", "✗".red(), e);
            EXIT_IO
        }
    }
}

/// Name what failed to match and, when a near-miss exists, where the
/// document almost matches.
fn report_locate_failure(err: &LocateError, document: &Document) {
    eprintln!("{} {}", "✗".red(), err);

    if let LocateError::MarkerNotFound { marker } = err {
        if let Some(miss) = diagnose::nearest_match(document, marker) {
            eprintln!(
                "  nearest candidate: line {}, column {} ({:.0}% similar)",
                miss.line,
                miss.column,
                miss.similarity * 100.0
            );
            for line in miss.snippet.lines() {
                eprintln!("  {} {}", "|".dimmed(), line.dimmed());
            }
        }
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Helper: Discover all .toml patch sets in `<root>/patches/`.
fn discover_patch_files(root: &Path) -> Result<Vec<PathBuf>> {
    let patches_dir = root.join("patches");
    if !patches_dir.exists() {
        anyhow::bail!("no patches/ directory under {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&patches_dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();

    if files.is_empty() {
        anyhow::bail!("no .toml patch sets in {}", patches_dir.display());
    }

    Ok(files)
}

fn exit_code_for(err: &ApplicationError) -> i32 {
    match err {
        ApplicationError::Io { .. }
        | ApplicationError::Encoding { .. }
        | ApplicationError::Safety { .. } => EXIT_IO,
        ApplicationError::Locate { .. }
        | ApplicationError::VerifyMismatch { .. }
        | ApplicationError::BadHashLiteral { .. } => EXIT_NOT_FOUND,
    }
}

/// Resolve a patch target the way the applicator will, for diff capture.
fn target_path(root: &Path, root_relative: bool, file: &str) -> PathBuf {
    if root_relative {
        root.join(file)
    } else {
        PathBuf::from(file)
    }
}

fn cmd_apply(root: PathBuf, patches: Option<PathBuf>, output: OutputArgs) -> i32 {
    let patch_files = match patches {
        Some(path) => vec![path],
        None => match discover_patch_files(&root) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                return EXIT_IO;
            }
        },
    };

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_failed = 0;
    let mut worst = 0;

    for patch_file in patch_files {
        println!("Loading patch set {}...", patch_file.display());

        let config = match load_from_path(&patch_file) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                total_failed += 1;
                worst = worst.max(EXIT_IO);
                continue;
            }
        };
        let config_dir = patch_file
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        // Capture before-images of the files the patches will touch, so a
        // diff can be shown after the atomic write replaces them.
        let mut before: HashMap<PathBuf, String> = HashMap::new();
        if output.diff && !output.dry_run {
            for patch in &config.patches {
                let path = target_path(&root, config.meta.root_relative, &patch.file);
                if let Ok(content) = fs::read_to_string(&path) {
                    before.insert(path, content);
                }
            }
        }

        let results = if output.dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
            check_all(&config, &root, &config_dir)
        } else {
            apply_all(&config, &root, &config_dir)
        };

        for (patch_id, result) in results {
            match result {
                Ok(PatchStatus::Applied { file }) => {
                    let verb = if output.dry_run { "Would apply" } else { "Applied" };
                    println!("{} {}: {} to {}", "✓".green(), patch_id, verb, file.display());
                    total_applied += 1;
                }
                Ok(PatchStatus::AlreadyApplied { file }) => {
                    println!(
                        "{} {}: Already applied to {}",
                        "⊙".yellow(),
                        patch_id,
                        file.display()
                    );
                    total_already_applied += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), patch_id, e);
                    total_failed += 1;
                    worst = worst.max(exit_code_for(&e));
                }
            }
        }

        for (path, original) in &before {
            if let Ok(after) = fs::read_to_string(path) {
                if original != &after {
                    display_diff(path, original, &after);
                }
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        worst
    } else {
        0
    }
}

fn cmd_status(root: PathBuf, patches: Option<PathBuf>) -> i32 {
    let patch_files = match patches {
        Some(path) => vec![path],
        None => match discover_patch_files(&root) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                return EXIT_IO;
            }
        },
    };

    println!("{}", "Patch Status Report".bold());
    println!("Root: {}", root.display());
    println!();

    let mut would_apply = Vec::new();
    let mut already_applied = Vec::new();
    let mut failed = Vec::new();
    let mut load_failure = false;

    for patch_file in patch_files {
        let config = match load_from_path(&patch_file) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                load_failure = true;
                continue;
            }
        };
        let config_dir = patch_file
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        for (patch_id, result) in check_all(&config, &root, &config_dir) {
            match result {
                Ok(PatchStatus::Applied { .. }) => would_apply.push(patch_id),
                Ok(PatchStatus::AlreadyApplied { .. }) => already_applied.push(patch_id),
                Err(e) => failed.push((patch_id, e.to_string())),
            }
        }
    }

    if !already_applied.is_empty() {
        println!(
            "{} {} ({} patches)",
            "✓".green(),
            "ALREADY APPLIED".green().bold(),
            already_applied.len()
        );
        for id in &already_applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !would_apply.is_empty() {
        println!(
            "{} {} ({} patches)",
            "⊙".yellow(),
            "WOULD APPLY".yellow().bold(),
            would_apply.len()
        );
        for id in &would_apply {
            println!("  - {}", id);
        }
        println!();
    }

    if !failed.is_empty() {
        println!(
            "{} {} ({} patches)",
            "✗".red(),
            "FAILED".red().bold(),
            failed.len()
        );
        for (id, reason) in &failed {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if load_failure {
        EXIT_IO
    } else {
        0
    }
}
