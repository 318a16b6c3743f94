//! Knowledge directory scanning and ingestion

use super::{KnowledgeStore, StoreError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extensions the scanner picks up
const KNOWLEDGE_EXTENSIONS: &[&str] = &["md", "txt", "json", "csv"];

/// A document discovered on disk
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    pub path: PathBuf,
    pub content: String,
    pub size: u64,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub embedded: usize,
    pub total: usize,
}

/// Recursively collect knowledge files under a directory
///
/// Unreadable and empty files are skipped with a warning. A missing
/// directory yields an empty list.
pub fn scan_directory(dir: &Path) -> Result<Vec<ScannedDocument>, StoreError> {
    let mut documents = Vec::new();
    if !dir.exists() {
        warn!("Knowledge directory {} does not exist", dir.display());
        return Ok(documents);
    }

    collect_files(dir, &mut documents)?;
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

fn collect_files(dir: &Path, documents: &mut Vec<ScannedDocument>) -> Result<(), StoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_files(&path, documents)?;
        } else if has_knowledge_extension(&path) {
            match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => {
                    let size = content.len() as u64;
                    documents.push(ScannedDocument {
                        path,
                        content,
                        size,
                    });
                }
                Ok(_) => warn!("Skipping empty file {}", path.display()),
                Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }
    }

    Ok(())
}

fn has_knowledge_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| KNOWLEDGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scan a directory and embed every discovered document into the store
///
/// The store is saved once at the end. Individual embedding failures are
/// logged and counted rather than aborting the run.
pub async fn ingest_directory(
    store: &KnowledgeStore,
    dir: &Path,
) -> Result<IngestSummary, StoreError> {
    let documents = scan_directory(dir)?;
    let total = documents.len();
    let mut embedded = 0;

    for doc in documents {
        let source = doc
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let file_type = doc
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        let metadata = serde_json::json!({
            "source": source,
            "type": file_type,
            "size": doc.size,
        });

        match store.add_document(&doc.content, &source, metadata).await {
            Ok(_) => embedded += 1,
            Err(e) => warn!("Failed to embed {}: {}", doc.path.display(), e),
        }
    }

    store.save().await?;
    info!("Ingested {}/{} documents", embedded, total);
    Ok(IngestSummary { embedded, total })
}
