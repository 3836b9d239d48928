use anyhow::{bail, Context, Result};
use clap::Parser;
use codevet::cli::{CacheAction, Cli, Commands};
use codevet::config::{load_config, parse_config, CodevetConfig};
use codevet::{
    DirectoryReport, Scope, ValidationOrchestrator, ValidationRequest, ValidationStatus, Verdict,
};
use colored::*;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    codevet::observability::init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.cache_dir)?;

    match cli.command {
        Commands::Check {
            path,
            function,
            recursive,
            json,
            no_models,
        } => {
            let mut config = config;
            if no_models {
                config.models.enabled = false;
            }
            let clean = handle_check(&config, &path, function.as_deref(), recursive, json)?;
            if !clean {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Cache { action } => handle_cache(&config, action),
    }
}

fn resolve_config(explicit: Option<&Path>, cache_dir: Option<PathBuf>) -> Result<CodevetConfig> {
    let mut config = match explicit {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            parse_config(&contents)?
        }
        None => load_config(),
    };
    if cache_dir.is_some() {
        config.cache.dir = cache_dir;
    }
    Ok(config)
}

/// Returns false when any verdict is NOT_VALID or ERROR.
fn handle_check(
    config: &CodevetConfig,
    path: &Path,
    function: Option<&str>,
    recursive: bool,
    json: bool,
) -> Result<bool> {
    let orchestrator = ValidationOrchestrator::from_config(config)?;

    if path.is_dir() {
        if function.is_some() {
            bail!("--function requires a file path, got directory {}", path.display());
        }
        let report = orchestrator.validate_directory(path, recursive);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_directory_report(&report);
        }
        return Ok(report.error.is_none() && report.files.iter().all(is_clean));
    }

    let verdict = match function {
        Some(name) => {
            let code = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let request = ValidationRequest::new(code, Scope::Function)
                .with_function_name(name)
                .with_file_path(path);
            orchestrator.validate(&request)
        }
        None => orchestrator.validate_file(path),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
        eprintln!("{}", orchestrator.get_stats().to_string().dimmed());
    }
    Ok(is_clean(&verdict))
}

fn handle_cache(config: &CodevetConfig, action: CacheAction) -> Result<()> {
    let mut config = config.clone();
    config.models.enabled = false;
    let orchestrator = ValidationOrchestrator::from_config(&config)?;
    let cache = orchestrator.cache();

    match action {
        CacheAction::Stats => {
            println!("{}", cache.cache_dir().display().to_string().bold());
            println!("{}", cache.stats());
        }
        CacheAction::Prune => {
            let stats = cache.prune()?;
            println!("{} {}", "Pruned:".green(), stats);
        }
        CacheAction::Clear => {
            cache.clear()?;
            println!("{} {}", "Cleared".green(), cache.cache_dir().display());
        }
    }
    Ok(())
}

fn is_clean(verdict: &Verdict) -> bool {
    !matches!(
        verdict.status,
        ValidationStatus::NotValid | ValidationStatus::Error
    )
}

fn status_label(status: ValidationStatus) -> ColoredString {
    match status {
        ValidationStatus::Valid => status.as_str().green().bold(),
        ValidationStatus::MostlyValid => status.as_str().yellow().bold(),
        ValidationStatus::NotValid => status.as_str().red().bold(),
        ValidationStatus::Error => status.as_str().red(),
        ValidationStatus::Unknown => status.as_str().dimmed(),
    }
}

fn print_verdict(verdict: &Verdict) {
    let target = verdict
        .file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string());
    println!(
        "{} {} ({:.0}% via {})",
        status_label(verdict.status),
        target.bold(),
        verdict.confidence * 100.0,
        verdict.source
    );
    println!("  {}", verdict.explanation);
    for suggestion in &verdict.suggestions {
        println!("  {} {}", "-".cyan(), suggestion);
    }
    if let Some(report) = &verdict.complexity_analysis {
        println!("  {}", report.summary().dimmed());
    }
    if let Some(similarity) = verdict.similarity {
        println!("  {}", format!("similar to a cached verdict ({similarity:.2})").dimmed());
    }
    if verdict.cost > 0.0 {
        println!("  {}", format!("cost ${:.6}", verdict.cost).dimmed());
    }
}

fn print_directory_report(report: &DirectoryReport) {
    if let Some(error) = &report.error {
        println!("{} {}: {}", "ERROR".red(), report.path.display(), error);
        return;
    }
    for verdict in &report.files {
        print_verdict(verdict);
    }
    let counts: Vec<String> = report
        .counts
        .iter()
        .map(|(status, n)| format!("{status} {n}"))
        .collect();
    println!();
    println!(
        "{} {} files: {} (total cost ${:.6})",
        "Summary".bold(),
        report.files.len(),
        counts.join(", "),
        report.total_cost
    );
}
