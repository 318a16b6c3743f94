use std::io::{BufRead, Write};
use std::path::PathBuf;

use sift::cli::{Cli, Commands, ConfigAction};
use sift::config::{expand_tilde, Config, ConfigValidator};
use sift::error::{Result, SiftError};
use sift::knowledge::{ingest_directory, StoreState};
use sift::pipeline::{build_provider, build_store, Pipeline};
use tracing::warn;

/// Longest question accepted before truncation.
const MAX_QUESTION_CHARS: usize = 500;

/// Longest answer printed in single-question mode before truncation.
const MAX_ANSWER_CHARS: usize = 4000;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask { question, json } => cmd_ask(cli.config, cli.profile, &question, json)?,
        Commands::Chat => cmd_chat(cli.config, cli.profile)?,
        Commands::Search { query, top_k } => cmd_search(cli.config, cli.profile, &query, top_k)?,
        Commands::Status { json } => cmd_status(cli.config, cli.profile, json)?,
        Commands::Ingest { path } => cmd_ingest(cli.config, cli.profile, path)?,
        Commands::Config { action } => cmd_config(cli.config, action)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "sift=debug" } else { "sift=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| SiftError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn resolve_config_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Config::default_path(),
    }
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = resolve_config_path(config_path)?;

    if !path.exists() {
        warn!("Config file not found, using defaults. Run 'sift config init' to create one.");
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        return Ok(config);
    }

    match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    question: &str,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let pipeline = Pipeline::from_config(&config)?;

    let rt = runtime()?;
    let answer = rt.block_on(pipeline.ask(&truncate_question(question)))?;

    if json {
        let rendered = serde_json::to_string_pretty(&answer).map_err(|e| SiftError::Json {
            source: e,
            context: "Failed to serialize answer".to_string(),
        })?;
        println!("{}", rendered);
    } else {
        println!("{}", truncate_answer(&answer.text));
        println!();
        println!("[route: {:?}, reason: {}]", answer.route, answer.reason);
    }

    Ok(())
}

fn cmd_chat(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let pipeline = Pipeline::from_config(&config)?;
    let rt = runtime()?;

    println!("Sift interactive mode. Ask a question, or type 'exit' to quit.");
    println!();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush().map_err(|e| SiftError::Io {
            source: e,
            context: "Failed to flush stdout".to_string(),
        })?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                return Err(SiftError::Io {
                    source: e,
                    context: "Failed to read from stdin".to_string(),
                });
            }
            None => {
                println!();
                println!("Goodbye!");
                break;
            }
        };

        let input = line.trim();

        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("Goodbye!");
            break;
        }

        if input.is_empty() {
            println!("Please enter a question or type 'exit' to quit.");
            continue;
        }

        match rt.block_on(pipeline.ask(&truncate_question(input))) {
            Ok(answer) => {
                println!();
                println!("{}", answer.text);
                println!();
            }
            Err(e) => {
                println!("Error: {}", e);
            }
        }
    }

    Ok(())
}

fn cmd_search(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    query: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let pipeline = Pipeline::from_config(&config)?;

    let rt = runtime()?;
    let rendered = rt.block_on(pipeline.search_wrapped(query, top_k));
    println!("{}", rendered);

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>, profile: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let provider = build_provider(&config)?;
    let store = build_store(&config, provider)?;

    let rt = runtime()?;
    let status = rt.block_on(store.status());

    if json {
        let rendered = serde_json::to_string_pretty(&status).map_err(|e| SiftError::Json {
            source: e,
            context: "Failed to serialize status".to_string(),
        })?;
        println!("{}", rendered);
    } else {
        let label = match status.status {
            StoreState::Ready => "ready",
            StoreState::Empty => "empty",
        };
        println!("Knowledge base: {}", label);
        println!("  Documents: {}", status.document_count);
        println!("  Last updated: {}", status.last_updated);
    }

    Ok(())
}

fn cmd_ingest(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let provider = build_provider(&config)?;
    let store = build_store(&config, provider)?;

    let dir = expand_tilde(&path.unwrap_or_else(|| config.knowledge.dir.clone()));
    println!("Ingesting documents from {}...", dir.display());

    let rt = runtime()?;
    let summary = rt.block_on(ingest_directory(&store, &dir))?;

    if summary.total == 0 {
        println!("⚠ No documents found in {}", dir.display());
    } else {
        println!("✓ Embedded {}/{} documents", summary.embedded, summary.total);
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, None)?;
            let tree = config_as_json(&config)?;

            let shown = match section {
                Some(section) => tree.get(&section).cloned().ok_or_else(|| {
                    SiftError::Config(format!("Unknown config section: {}", section))
                })?,
                None => tree,
            };

            let rendered = serde_json::to_string_pretty(&shown).map_err(|e| SiftError::Json {
                source: e,
                context: "Failed to render configuration".to_string(),
            })?;
            println!("{}", rendered);
        }
        ConfigAction::Set { key, value } => {
            let path = resolve_config_path(config_path)?;
            if !path.exists() {
                return Err(SiftError::ConfigNotFound { path });
            }

            // Read the file directly so environment overrides are not baked in.
            let content = std::fs::read_to_string(&path).map_err(|e| SiftError::Io {
                source: e,
                context: format!("Failed to read config file: {:?}", path),
            })?;
            let config: Config = toml::from_str(&content)?;

            let mut tree = config_as_json(&config)?;
            let pointer = format!("/{}", key.replace('.', "/"));
            let slot = tree
                .pointer_mut(&pointer)
                .ok_or_else(|| SiftError::Config(format!("Unknown config key: {}", key)))?;
            *slot = parse_config_value(&value);

            let mut updated: Config = serde_json::from_value(tree).map_err(|e| SiftError::Json {
                source: e,
                context: format!("Value does not fit config key: {}", key),
            })?;
            updated.meta.last_modified = chrono::Utc::now().to_rfc3339();
            ConfigValidator::validate(&updated)?;
            updated.save(&path)?;

            println!("✓ Set {} = {}", key, value);
        }
        ConfigAction::Get { key } => {
            let config = load_config(config_path, None)?;
            let tree = config_as_json(&config)?;
            let pointer = format!("/{}", key.replace('.', "/"));
            match tree.pointer(&pointer) {
                Some(value) => println!("{}", value),
                None => return Err(SiftError::Config(format!("Unknown config key: {}", key))),
            }
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(file) => file,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SiftError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn config_as_json(config: &Config) -> Result<serde_json::Value> {
    serde_json::to_value(config).map_err(|e| SiftError::Json {
        source: e,
        context: "Failed to convert configuration to JSON".to_string(),
    })
}

/// Interprets `true`, `5`, or `1.5` as typed values and everything else as a string.
fn parse_config_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn truncate_question(question: &str) -> String {
    if question.chars().count() > MAX_QUESTION_CHARS {
        warn!(
            "Question too long, truncating to {} characters",
            MAX_QUESTION_CHARS
        );
        question.chars().take(MAX_QUESTION_CHARS).collect()
    } else {
        question.to_string()
    }
}

fn truncate_answer(text: &str) -> String {
    if text.chars().count() > MAX_ANSWER_CHARS {
        let truncated: String = text.chars().take(MAX_ANSWER_CHARS).collect();
        format!("{}... [Response truncated due to length]", truncated)
    } else {
        text.to_string()
    }
}
