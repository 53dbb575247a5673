mod cli;
mod progress;

use clipjoin::{
    batch::{BatchEvent, BatchRunner, DestinationNaming},
    config, ingest,
    join::{FfmpegJoiner, JoinOutcome, Joiner},
    report,
};
use clipjoin_common::format::{format_duration, format_file_size};
use clipjoin_common::paths::strip_extension;
use clipjoin_common::Classifier;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use progress::{CopyBar, JoinBar};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line overrides for `run`.
struct RunOptions {
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    staging: Option<PathBuf>,
    no_copy: bool,
    keep_fragments: bool,
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipjoin=debug,clipjoin_av=debug,clipjoin_common=debug".to_string()
        } else {
            // Normal mode: progress goes to stdout, logs only for problems
            "clipjoin=warn,clipjoin_av=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            source,
            output,
            staging,
            no_copy,
            keep_fragments,
            dry_run,
        } => run_batch(
            cli.config.as_deref(),
            RunOptions {
                source,
                output,
                staging,
                no_copy,
                keep_fragments,
                dry_run,
            },
        ),
        Commands::Join {
            name,
            inputs,
            output_dir,
        } => join_files(cli.config.as_deref(), &name, &inputs, output_dir),
        Commands::Plan { dir, json } => plan_dir(cli.config.as_deref(), dir, json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipjoin {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_batch(config_path: Option<&Path>, options: RunOptions) -> Result<()> {
    let started = Instant::now();
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(source) = options.source {
        config.paths.source_dir = Some(source);
    }
    if let Some(output) = options.output {
        config.paths.output_dir = output;
    }
    if let Some(staging) = options.staging {
        config.paths.staging_dir = Some(staging);
    }
    if options.no_copy {
        config.paths.staging_dir = None;
    }
    if options.keep_fragments {
        config.run.cleanup_fragments = false;
    }
    config::validate_config(&config)?;

    let source = config.paths.source_dir.clone().ok_or_else(|| {
        anyhow::anyhow!("No source directory: pass --source or set paths.source_dir")
    })?;
    let output = config.paths.output_dir.clone();
    let staging = config.paths.staging_dir.clone();
    ingest::validate_directory(&source)?;

    let classifier = Classifier::new(&config.grouping)?;
    let videos = ingest::list_video_files(&source, &classifier)?;
    if videos.is_empty() {
        println!("No video files found in {}", source.display());
        return Ok(());
    }
    println!(
        "Found {} video file(s) in {} ({})",
        videos.len(),
        source.display(),
        format_file_size(ingest::total_size(&source, &videos))
    );

    let classification = classifier.partition(&videos);
    let join_bar = JoinBar::new(classification.groups.len());
    let join_progress = join_bar.clone();

    let joiner = FfmpegJoiner::from_config(&config);
    let runner = BatchRunner::new(&classifier, &joiner)
        .with_naming(DestinationNaming::new(
            config.naming.template.as_str(),
            config.grouping.extension.as_str(),
        ))
        .with_progress_callback(Box::new(move |event: &BatchEvent<'_>| {
            join_progress.update(event)
        }));

    let plan = runner.plan(&classification);

    println!("\nVideo groups found: {}", plan.len());
    if !plan.is_empty() {
        print!("{}", report::group_table(&plan, &config.grouping.extension));
    }
    if !classification.completed.is_empty() {
        println!(
            "Skipped {} already-joined file(s)",
            classification.completed.len()
        );
    }

    if plan.is_empty() {
        println!("No fragment groups to join");
        return Ok(());
    }

    if options.dry_run {
        println!(
            "\n[DRY RUN] Would join {} group(s) into {}",
            plan.len(),
            output.display()
        );
        return Ok(());
    }

    ingest::ensure_directory(&output)?;

    let (work_dir, files_copied) = match &staging {
        Some(staging) => {
            ingest::ensure_separate_directories(&source, staging)?;
            ingest::ensure_directory(staging)?;
            if config.run.clear_staging {
                let removed = ingest::clear_directory(staging)?;
                if removed > 0 {
                    println!("Cleared {} entries from {}", removed, staging.display());
                }
            }
            let bytes_total = ingest::total_size(&source, &videos);
            ingest::check_disk_space(staging, bytes_total);

            println!("\nCopying {} file(s) to {}", videos.len(), staging.display());
            let copy_bar = CopyBar::new(bytes_total);
            let copied = ingest::copy_files(&source, staging, &videos, |p| copy_bar.update(p));
            copy_bar.finish();
            let stats = copied?;
            println!(
                "Copied {} file(s) ({})",
                stats.files,
                format_file_size(stats.bytes)
            );
            (staging.clone(), stats.files)
        }
        None => (source.clone(), 0),
    };

    let fragment_names: Vec<&str> = classification
        .groups
        .iter()
        .flat_map(|g| g.names())
        .collect();
    ingest::check_disk_space(&output, ingest::total_size(&work_dir, &fragment_names));

    println!();
    join_bar.start();
    let batch = runner.run_classified(classification, &work_dir, &output);
    join_bar.finish();

    let mut input_bytes = 0;
    for group in batch.successes() {
        input_bytes += ingest::total_size(&work_dir, &group.group.names());
    }

    println!();
    for group in batch.outcomes().values() {
        println!("{}", report::outcome_line(group));
    }

    if staging.is_some() && config.run.cleanup_fragments {
        let mut deleted = 0;
        for group in batch.successes() {
            deleted += ingest::delete_files(&work_dir, &group.group.names());
        }
        if deleted > 0 {
            println!("Cleaned up {} fragment file(s)", deleted);
        }
    }

    let mut stats = report::RunStats::from_report(&batch, input_bytes);
    stats.files_copied = files_copied;
    stats.elapsed = started.elapsed();
    println!("\nSummary:");
    print!("{}", stats.summary());

    if !batch.is_success() {
        eprintln!("\nFailed groups:");
        eprint!("{}", report::failure_details(&batch));
        anyhow::bail!(
            "{} of {} group(s) failed",
            batch.failures().count(),
            batch.len()
        );
    }

    println!("\nAll groups joined successfully!");
    Ok(())
}

fn join_files(
    config_path: Option<&Path>,
    name: &str,
    inputs: &[PathBuf],
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let output_dir = output_dir.unwrap_or_else(|| config.paths.output_dir.clone());
    let name = strip_extension(name.trim(), &config.grouping.extension);

    let joiner = FfmpegJoiner::from_config(&config);
    match joiner.join(inputs, name, &output_dir) {
        JoinOutcome::Success(joined) => {
            print!(
                "✓ Joined {} file(s) into {} ({}",
                joined.inputs,
                joined.path.display(),
                format_file_size(joined.size)
            );
            if let Some(duration) = joined.duration {
                print!(", {}", format_duration(duration));
            }
            println!(")");
            Ok(())
        }
        JoinOutcome::Failure(failure) => {
            anyhow::bail!("Join failed ({}): {}", failure.kind(), failure)
        }
    }
}

fn plan_dir(config_path: Option<&Path>, dir: Option<PathBuf>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let dir = dir
        .or_else(|| config.paths.source_dir.clone())
        .ok_or_else(|| anyhow::anyhow!("No directory given and paths.source_dir is not set"))?;
    ingest::validate_directory(&dir)?;

    let classifier = Classifier::new(&config.grouping)?;
    let names = ingest::list_file_names(&dir)?;
    let classification = classifier.partition(&names);

    let joiner = FfmpegJoiner::from_config(&config);
    let plan = BatchRunner::new(&classifier, &joiner)
        .with_naming(DestinationNaming::new(
            config.naming.template.as_str(),
            config.grouping.extension.as_str(),
        ))
        .plan(&classification);

    if json {
        let groups: Vec<serde_json::Value> = plan
            .iter()
            .map(|p| {
                serde_json::json!({
                    "key": p.group.key(),
                    "fragments": p.group.names(),
                    "output": p.destination.as_ref().ok().map(|name| {
                        format!("{}.{}", name, config.grouping.extension)
                    }),
                    "error": p.destination.as_ref().err().map(ToString::to_string),
                    "warnings": p.warnings,
                })
            })
            .collect();
        let value = serde_json::json!({
            "directory": dir,
            "groups": groups,
            "completed": classification.completed,
            "ignored": classification.ignored,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialize plan")?
        );
        return Ok(());
    }

    println!("Directory: {}", dir.display());
    println!(
        "Groups: {} ({} fragment(s))",
        plan.len(),
        classification.fragment_count()
    );
    if !plan.is_empty() {
        print!("{}", report::group_table(&plan, &config.grouping.extension));
    }
    println!(
        "Already joined: {}",
        if classification.completed.is_empty() {
            "none".to_string()
        } else {
            classification.completed.join(", ")
        }
    );
    if !classification.ignored.is_empty() {
        println!("Ignored: {}", classification.ignored.len());
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = clipjoin_av::check_tools(&config.tools.tool_paths());

    let mut ffmpeg_ok = false;
    for tool in &tools {
        let role = if tool.name == "ffmpeg" {
            ffmpeg_ok = tool.available;
            "joins fragments"
        } else {
            "reports durations (optional)"
        };
        let mark = if tool.available { "✓" } else { "✗" };
        let location = match (&tool.path, &tool.version) {
            (Some(path), Some(version)) => format!("{} ({})", path.display(), version),
            (Some(path), None) => format!("{} (not runnable)", path.display()),
            (None, _) => "not found".to_string(),
        };
        println!("{} {:<8} {:<30} {}", mark, tool.name, role, location);
    }

    if !ffmpeg_ok {
        anyhow::bail!("ffmpeg is required: install it or set tools.ffmpeg_path");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).or_else(config::find_default_config);

    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(&p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file found, using defaults");
            config::Config::default()
        }
    };

    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };
    println!("  Source dir: {}", show(&config.paths.source_dir));
    println!("  Staging dir: {}", show(&config.paths.staging_dir));
    println!("  Output dir: {}", config.paths.output_dir.display());
    println!(
        "  Grouping: key length {}, extension {}, completed pattern {}",
        config.grouping.key_length,
        config.grouping.extension,
        config.grouping.completed_pattern()
    );
    println!("  Naming template: {}", config.naming.template);
    match config.tools.timeout_secs {
        Some(secs) => println!("  Tool timeout: {}s", secs),
        None => println!("  Tool timeout: none"),
    }

    Ok(())
}
