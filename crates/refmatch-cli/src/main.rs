mod analyze;
mod config;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refmatch_core::{ReferenceMatcher, ReferenceRecord, ReportOrder};
use refmatch_ris::{ExportOptions, read_ris_file, write_ris};
use refmatch_search::{SearchField, search_records};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 3;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "refmatch",
    about = "Compare and deduplicate bibliographic reference files",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting REFMATCH_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two RIS files and report overlap.
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Only exact identifier and title+year matches.
        #[arg(long)]
        no_fuzzy: bool,
    },

    /// Deduplicate one or more RIS files.
    Dedup {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        no_fuzzy: bool,
        /// Write the unique references to this RIS file.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Add N1 notes describing where each reference was found.
        #[arg(long)]
        include_provenance: bool,
        /// Report order: first-seen or year-title.
        #[arg(long)]
        sort: Option<ReportOrder>,
    },

    /// Summarize a RIS file by year, author and journal.
    Analyze { file: PathBuf },

    /// Run a boolean query (AND, OR, quotes, * wildcards) against a RIS file.
    Search {
        file: PathBuf,
        query: String,
        /// Fields to search, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = SearchField::DEFAULT.to_vec())]
        fields: Vec<SearchField>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_INVALID_ARGS)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let json_output = cli.json || std::env::var("REFMATCH_JSON").as_deref() == Ok("1");
    match run(cli, json_output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_output {
                let _ = print_json(&serde_json::json!({
                    "status": "error",
                    "message": format!("{err:#}"),
                }));
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli, json_flag: bool) -> Result<()> {
    let start = Instant::now();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)?;
    init_logging(&config.logging.level, cli.verbose);
    debug!(path = %config_path.display(), "loaded configuration");

    let json_output = json_flag || config.output.json;

    match cli.command {
        Commands::Compare { a, b, no_fuzzy } => {
            let matcher = matcher_for(&config, no_fuzzy)?;
            let mut sources = read_sources(&[a, b])?.into_iter();
            let (Some((label_a, records_a)), Some((label_b, records_b))) =
                (sources.next(), sources.next())
            else {
                anyhow::bail!("compare needs two sources");
            };

            let result = matcher.compare(&records_a, &records_b)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "a": label_a,
                        "b": label_b,
                        "stats": result.stats(),
                        "overlap": result.overlap,
                        "unique_a": result.unique_a,
                        "unique_b": result.unique_b,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print!("{}", output::render_comparison(&result, &label_a, &label_b));
            }
        }

        Commands::Dedup {
            files,
            no_fuzzy,
            output: output_path,
            include_provenance,
            sort,
        } => {
            let matcher = matcher_for(&config, no_fuzzy)?;
            let sources = read_sources(&files)?;

            let mut result = matcher.deduplicate(&sources)?;
            result.sort_for_report(sort.unwrap_or(config.output.order));

            if let Some(path) = output_path.as_deref() {
                let options = ExportOptions {
                    include_provenance: include_provenance || config.output.include_provenance,
                };
                std::fs::write(path, write_ris(&result.unique, &options))
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), records = result.unique.len(), "wrote unique references");
            }

            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "stats": result.stats(),
                        "unique": result.unique,
                        "removed_duplicates": result.removed_duplicates,
                        "output": output_path,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print!("{}", output::render_dedup(&result));
                if let Some(path) = output_path.as_deref() {
                    println!("\nWrote {} references to {}", result.unique.len(), path.display());
                }
            }
        }

        Commands::Analyze { file } => {
            let label = file_label(&file);
            let records = read_source(&file, &label)?;
            let analysis = analyze::analyze(&records);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "file": label, "analysis": analysis },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print!("{}", output::render_analysis(&analysis));
            }
        }

        Commands::Search {
            file,
            query,
            fields,
        } => {
            let label = file_label(&file);
            let records = read_source(&file, &label)?;
            let outcome = search_records(&records, &query, &fields)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "file": label,
                        "stats": outcome.stats,
                        "hits": outcome.hits,
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print!("{}", output::render_search(&outcome, &label));
            }
        }

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::Show => {
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": config,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        print!("{}", toml::to_string_pretty(&config)?);
                    }
                }
                ConfigAction::Path => {
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "path": config_path, "exists": config_path.exists() },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("{}", config_path.display());
                    }
                }
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(level: &str, verbose: u8) {
    let fallback = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn matcher_for(config: &AppConfig, no_fuzzy: bool) -> Result<ReferenceMatcher> {
    let mut matching = config.matching.clone();
    if no_fuzzy {
        matching.fuzzy.enabled = false;
    }
    Ok(ReferenceMatcher::with_config(matching)?)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One label per path: the file name, the full path when file names
/// collide, and a `#n` suffix when the same path is given more than once.
fn source_labels(paths: &[PathBuf]) -> Vec<String> {
    let names: Vec<String> = paths.iter().map(|path| file_label(path)).collect();
    let labels: Vec<String> = paths
        .iter()
        .zip(&names)
        .map(|(path, name)| {
            if names.iter().filter(|other| *other == name).count() > 1 {
                path.display().to_string()
            } else {
                name.clone()
            }
        })
        .collect();

    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let earlier = labels[..idx].iter().filter(|other| *other == label).count();
            if earlier == 0 {
                label.clone()
            } else {
                format!("{label} #{}", earlier + 1)
            }
        })
        .collect()
}

fn read_source(path: &Path, label: &str) -> Result<Vec<ReferenceRecord>> {
    read_ris_file(path, label).with_context(|| format!("reading {}", path.display()))
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<(String, Vec<ReferenceRecord>)>> {
    paths
        .iter()
        .zip(source_labels(paths))
        .map(|(path, label)| {
            let records = read_source(path, &label)?;
            Ok((label, records))
        })
        .collect()
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_dedup_flags() {
        let cli = Cli::try_parse_from([
            "refmatch",
            "dedup",
            "a.ris",
            "b.ris",
            "--no-fuzzy",
            "--output",
            "out.ris",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Dedup {
                files,
                no_fuzzy,
                output,
                include_provenance,
                sort,
            } => {
                assert_eq!(files.len(), 2);
                assert!(no_fuzzy);
                assert_eq!(output, Some(PathBuf::from("out.ris")));
                assert!(!include_provenance);
                assert_eq!(sort, None);
            }
            _ => panic!("expected dedup"),
        }
    }

    #[test]
    fn dedup_requires_files() {
        assert!(Cli::try_parse_from(["refmatch", "dedup"]).is_err());
    }

    #[test]
    fn labels_use_file_name() {
        assert_eq!(file_label(Path::new("/tmp/exports/pubmed.ris")), "pubmed.ris");
        let labels = source_labels(&[PathBuf::from("x/pubmed.ris"), PathBuf::from("y/scopus.ris")]);
        assert_eq!(labels, vec!["pubmed.ris", "scopus.ris"]);
    }

    #[test]
    fn colliding_file_names_fall_back_to_paths() {
        let labels = source_labels(&[
            PathBuf::from("exports/a/refs.ris"),
            PathBuf::from("exports/b/refs.ris"),
            PathBuf::from("exports/a/refs.ris"),
            PathBuf::from("other.ris"),
        ]);
        assert_eq!(
            labels,
            vec![
                PathBuf::from("exports/a/refs.ris").display().to_string(),
                PathBuf::from("exports/b/refs.ris").display().to_string(),
                format!("{} #2", PathBuf::from("exports/a/refs.ris").display()),
                "other.ris".to_string(),
            ]
        );
    }

    #[test]
    fn dedup_keeps_same_named_files_apart() {
        let dir = tempfile::tempdir().unwrap();
        let entry = "TY  - JOUR\nTI  - Alpha\nPY  - 2020\nER  -\n";
        let mut paths = Vec::new();
        for sub in ["a", "b"] {
            let folder = dir.path().join(sub);
            std::fs::create_dir_all(&folder).unwrap();
            let path = folder.join("refs.ris");
            std::fs::write(&path, entry).unwrap();
            paths.push(path);
        }

        let sources = read_sources(&paths).unwrap();
        let matcher = matcher_for(&AppConfig::default(), false).unwrap();
        let result = matcher.deduplicate(&sources).unwrap();
        let stats = result.stats();

        assert_eq!(stats.num_sources, 2);
        assert_eq!(stats.per_source.len(), 2);
        let removed = &result.removed_duplicates[0];
        assert_eq!(removed.duplicate_of, paths[0].display().to_string());
        assert_eq!(removed.source_file, paths[1].display().to_string());
    }

    #[test]
    fn parses_sort_flag() {
        let cli = Cli::try_parse_from(["refmatch", "dedup", "a.ris", "--sort", "year-title"]).unwrap();
        match cli.command {
            Commands::Dedup { sort, .. } => assert_eq!(sort, Some(ReportOrder::YearTitle)),
            _ => panic!("expected dedup"),
        }
    }

    #[test]
    fn search_fields_default_and_split() {
        let cli = Cli::try_parse_from(["refmatch", "search", "a.ris", "llm*"]).unwrap();
        match cli.command {
            Commands::Search { query, fields, .. } => {
                assert_eq!(query, "llm*");
                assert_eq!(fields, vec![SearchField::Title, SearchField::Abstract]);
            }
            _ => panic!("expected search"),
        }

        let cli = Cli::try_parse_from([
            "refmatch",
            "search",
            "a.ris",
            "gpt OR llm",
            "--fields",
            "keywords,journal",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { fields, .. } => {
                assert_eq!(fields, vec![SearchField::Keywords, SearchField::Journal]);
            }
            _ => panic!("expected search"),
        }

        assert!(Cli::try_parse_from(["refmatch", "search", "a.ris", "x", "--fields", "doi"]).is_err());
    }

    #[test]
    fn no_fuzzy_overrides_config() {
        let matcher = matcher_for(&AppConfig::default(), true).unwrap();
        assert!(!matcher.config().fuzzy.enabled);
    }
}
