//! Command-line interface for the redactor PII detection and redaction engine.
//!
//! One subcommand, `redact`: reads a text file, runs the hybrid text
//! detection pipeline, resolves replacements, and writes the redacted text
//! plus a JSON entity-mapping file alongside it. File-type dispatch for
//! scans/images is left to the `redactor` library's public API, not
//! duplicated here -- this binary exercises the text pipeline end to end.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redactor::core::TaxonomyStore;
use redactor::ner::TextNerClient;
use redactor::taxonomy::TaxonomyRegistry;
use redactor::text_detector::{self, NerMode};
use redactor::types::{CorefTable, ReplacementMode};

/// Redactor PII detection and redaction CLI.
#[derive(Parser)]
#[command(name = "redactor")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact PII from a text document.
    Redact {
        /// Path to the input text file.
        input: PathBuf,

        /// Path to write the redacted text to.
        output: PathBuf,

        /// Replacement mode: smart, mask, structured, or custom.
        #[arg(short, long, default_value = "smart")]
        mode: ModeArg,

        /// Path to a persisted taxonomy JSON file. Falls back to built-in presets if absent.
        #[arg(long)]
        taxonomy: Option<PathBuf>,

        /// Base URL of the text-NER model's chat-completion endpoint.
        #[arg(long, default_value = "http://localhost:8080")]
        ner_url: String,
    },

    /// Start the HTTP API server.
    #[cfg(feature = "api")]
    Serve {
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        #[arg(long)]
        taxonomy: Option<PathBuf>,

        #[arg(long, default_value = "http://localhost:8080")]
        ner_url: String,

        #[arg(long, default_value = "http://localhost:8081")]
        ocr_url: String,

        #[arg(long, default_value = "http://localhost:8082")]
        vlm_url: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Smart,
    Mask,
    Structured,
    Custom,
}

impl std::str::FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smart" => Ok(ModeArg::Smart),
            "mask" => Ok(ModeArg::Mask),
            "structured" => Ok(ModeArg::Structured),
            "custom" => Ok(ModeArg::Custom),
            _ => Err(format!("invalid mode: {s}. use 'smart', 'mask', 'structured', or 'custom'")),
        }
    }
}

impl From<ModeArg> for ReplacementMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Smart => ReplacementMode::Smart,
            ModeArg::Mask => ReplacementMode::Mask,
            ModeArg::Structured => ReplacementMode::Structured,
            ModeArg::Custom => ReplacementMode::Custom,
        }
    }
}

fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file not found: '{}'", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("not a regular file: '{}'", path.display());
    }
    Ok(())
}

fn load_taxonomy(path: Option<PathBuf>) -> TaxonomyRegistry {
    match path {
        Some(path) => (*TaxonomyStore::load(path).snapshot()).clone(),
        None => TaxonomyRegistry::with_presets(),
    }
}

/// Sorts replacements by descending needle length so a longer mention claims
/// its span before a shorter one that happens to be its substring.
fn apply_entity_map(text: &str, entity_map: &std::collections::HashMap<String, String>) -> String {
    let mut needles: Vec<&String> = entity_map.keys().collect();
    needles.sort_by_key(|b| std::cmp::Reverse(b.chars().count()));

    let mut out = text.to_string();
    for needle in needles {
        if needle.is_empty() {
            continue;
        }
        out = out.replace(needle.as_str(), &entity_map[needle]);
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Redact { input, output, mode, taxonomy, ner_url } => {
            validate_file_exists(&input)?;

            let document = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read input file '{}'", input.display()))?;

            let registry = load_taxonomy(taxonomy);
            let enabled_type_ids: Vec<String> = registry.list(true).into_iter().map(|e| e.id.clone()).collect();
            let ner_client = TextNerClient::new(ner_url);

            let mut coref = CorefTable::new();
            let detection =
                text_detector::detect(&document, &registry, &enabled_type_ids, &ner_client, NerMode::Auto, &mut coref)
                    .await;

            for warning in &detection.warnings {
                tracing::warn!(stage = %warning.stage, message = %warning.message, "detection warning");
            }

            let mut engine = redactor::replacement::ReplacementEngine::new();
            let (entity_map, comparison) =
                engine.resolve_all(&detection.entities, mode.into(), &registry, &mut coref, None);

            let redacted = apply_entity_map(&document, &entity_map);
            std::fs::write(&output, redacted)
                .with_context(|| format!("failed to write output file '{}'", output.display()))?;

            let map_path = output.with_extension("map.json");
            let map_json = serde_json::json!({ "entity_map": entity_map, "comparison": comparison });
            std::fs::write(&map_path, serde_json::to_string_pretty(&map_json)?)
                .with_context(|| format!("failed to write mapping file '{}'", map_path.display()))?;

            println!("redacted {} entities, wrote '{}' and '{}'", comparison.len(), output.display(), map_path.display());
        }

        #[cfg(feature = "api")]
        Commands::Serve { host, port, taxonomy, ner_url, ocr_url, vlm_url } => {
            use std::sync::Arc;

            let taxonomy_store = match taxonomy {
                Some(path) => TaxonomyStore::load(path),
                None => TaxonomyStore::in_memory(),
            };

            let state = redactor::api::AppState {
                taxonomy: Arc::new(taxonomy_store),
                ner_client: Arc::new(TextNerClient::new(ner_url)),
                ocr_client: Arc::new(redactor::ocr::OcrClient::new(ocr_url)),
                vlm_detector: Arc::new(redactor::vlm::VlmDetector::new(vlm_url)),
            };

            println!("starting redactor API server on http://{host}:{port}...");
            redactor::api::serve(&host, port, state)
                .await
                .with_context(|| format!("failed to start API server on {host}:{port}"))?;
        }
    }

    Ok(())
}
