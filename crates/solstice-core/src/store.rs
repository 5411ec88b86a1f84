//! Path layout and on-disk cache store.
//!
//! Every ingested document lives under `<cache_root>/<doc_id>/` with one
//! subdirectory per pipeline stage. The store owns all persisted bytes;
//! other components go through the JSON helpers here so parent directories
//! always exist and formatting stays canonical (UTF-8, two-space indent).

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Result, SolsticeError};

/// Derive a per-document identifier from a PDF path.
///
/// Takes the filename stem and replaces every character outside
/// `[A-Za-z0-9_.\-]` with `_`. When the sanitized value is empty or begins
/// with `.`, falls back to the first 8 hex characters of a SHA-256 over the
/// file bytes (or over the path string if the file is not yet readable).
#[must_use = "returns the derived document identifier"]
pub fn document_id(pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.starts_with('.') {
        let digest = match fs::read(pdf_path) {
            Ok(bytes) => Sha256::digest(&bytes),
            Err(_) => Sha256::digest(pdf_path.to_string_lossy().as_bytes()),
        };
        format!("{digest:x}")[..8].to_string()
    } else {
        sanitized
    }
}

/// Per-document directory layout under the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    root: PathBuf,
}

impl DocumentPaths {
    /// Resolve the layout for a document ID under `cache_root`.
    #[must_use = "returns the resolved document paths"]
    pub fn new(cache_root: &Path, doc_id: &str) -> Self {
        Self {
            root: cache_root.join(doc_id),
        }
    }

    /// Document root: `<cache_root>/<doc_id>`.
    #[must_use = "returns the document root directory"]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Page raster directory.
    #[must_use = "returns the pages directory"]
    pub fn pages_dir(&self) -> PathBuf {
        self.root.join("pages")
    }

    /// Raster path for a page: `pages/page-NNN.png`.
    #[must_use = "returns the raster path for the page"]
    pub fn page_image(&self, page_index: usize) -> PathBuf {
        self.pages_dir().join(format!("page-{page_index:03}.png"))
    }

    /// Raw detector output directory.
    #[must_use = "returns the raw layouts directory"]
    pub fn raw_layouts_dir(&self) -> PathBuf {
        self.root.join("raw_layouts")
    }

    /// Raw detector boxes JSON.
    #[must_use = "returns the raw boxes JSON path"]
    pub fn raw_boxes_json(&self) -> PathBuf {
        self.raw_layouts_dir().join("raw_layout_boxes.json")
    }

    /// Optional raw-layout visualization for a page.
    #[must_use = "returns the visualization path for the page"]
    pub fn raw_visualization(&self, page_index: usize) -> PathBuf {
        self.raw_layouts_dir()
            .join("visualizations")
            .join(format!("page_{page_index:03}_raw_layout.png"))
    }

    /// Post-resolution boxes directory.
    #[must_use = "returns the merged directory"]
    pub fn merged_dir(&self) -> PathBuf {
        self.root.join("merged")
    }

    /// Post-resolution boxes JSON.
    #[must_use = "returns the merged boxes JSON path"]
    pub fn merged_boxes_json(&self) -> PathBuf {
        self.merged_dir().join("merged_boxes.json")
    }

    /// Extracted content directory.
    #[must_use = "returns the extracted directory"]
    pub fn extracted_dir(&self) -> PathBuf {
        self.root.join("extracted")
    }

    /// The persisted document.
    #[must_use = "returns the content JSON path"]
    pub fn content_json(&self) -> PathBuf {
        self.extracted_dir().join("content.json")
    }

    /// Directory for figure/table crops.
    #[must_use = "returns the figures directory"]
    pub fn figures_dir(&self) -> PathBuf {
        self.extracted_dir().join("figures")
    }

    /// Crop filename for a graphical block:
    /// `figures/{figure|table}_p<page>_<block_id>.png`.
    #[must_use = "returns the crop path for the block"]
    pub fn figure_image(&self, role_lower: &str, page_index: usize, block_id: &str) -> PathBuf {
        self.figures_dir()
            .join(format!("{role_lower}_p{page_index}_{block_id}.png"))
    }
}

/// Serialize `value` as pretty JSON (two-space indent) to `path`, creating
/// parent directories as needed.
///
/// # Errors
///
/// Returns an error if directory creation, serialization, or the write fails.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SolsticeError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| SolsticeError::io(path, e))
}

/// Read and deserialize a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| SolsticeError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load a persisted document by ID.
///
/// # Errors
///
/// Returns an error if `content.json` is missing or malformed.
pub fn load_document(cache_root: &Path, doc_id: &str) -> Result<Document> {
    let paths = DocumentPaths::new(cache_root, doc_id);
    read_json(&paths.content_json())
}

/// List document IDs that have a persisted `content.json` under the root.
///
/// Returns IDs sorted lexicographically for deterministic output.
#[must_use = "returns the list of ingested document IDs"]
pub fn list_ingested(cache_root: &Path) -> Vec<String> {
    let mut ids = Vec::new();
    let Ok(entries) = fs::read_dir(cache_root) else {
        return ids;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && path.join("extracted").join("content.json").is_file() {
            if let Some(name) = path.file_name() {
                ids.push(name.to_string_lossy().into_owned());
            }
        }
    }
    ids.sort();
    ids
}

/// Remove one document's cache directory.
///
/// # Errors
///
/// Returns an error if removal fails for a reason other than the directory
/// not existing.
pub fn clear_document(cache_root: &Path, doc_id: &str) -> Result<()> {
    let root = cache_root.join(doc_id);
    match fs::remove_dir_all(&root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SolsticeError::io(root, e)),
    }
}

/// Remove the entire cache root.
///
/// # Errors
///
/// Returns an error if removal fails for a reason other than the directory
/// not existing.
pub fn clear_all(cache_root: &Path) -> Result<()> {
    match fs::remove_dir_all(cache_root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SolsticeError::io(cache_root, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_sanitizes() {
        assert_eq!(document_id(Path::new("/tmp/My Report (v2).pdf")), "My_Report__v2_");
        assert_eq!(document_id(Path::new("clean-name_1.0.pdf")), "clean-name_1.0");
    }

    #[test]
    fn test_document_id_fallback_hashes_path() {
        // A stem that sanitizes to a dot-leading name falls back to a hash
        // of the (unreadable) path string: 8 lowercase hex characters.
        let id = document_id(Path::new("/nonexistent/.hidden.pdf"));
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_document_id_fallback_hashes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("….pdf");
        fs::write(&path, b"%PDF-1.4 fake").unwrap();
        let id = document_id(&path);
        assert_eq!(id.len(), 8);
        // Deterministic over content
        assert_eq!(id, document_id(&path));
    }

    #[test]
    fn test_paths_layout() {
        let p = DocumentPaths::new(Path::new("/cache"), "doc");
        assert_eq!(p.page_image(7), Path::new("/cache/doc/pages/page-007.png"));
        assert_eq!(
            p.raw_boxes_json(),
            Path::new("/cache/doc/raw_layouts/raw_layout_boxes.json")
        );
        assert_eq!(
            p.content_json(),
            Path::new("/cache/doc/extracted/content.json")
        );
        assert_eq!(
            p.figure_image("figure", 2, "det_2_004"),
            Path::new("/cache/doc/extracted/figures/figure_p2_det_2_004.png")
        );
    }

    #[test]
    fn test_json_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("value.json");
        write_json_pretty(&path, &serde_json::json!({"a": 1})).unwrap();
        let back: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(back["a"], 1);
    }

    #[test]
    fn test_list_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for id in ["beta", "alpha"] {
            let content = root.join(id).join("extracted").join("content.json");
            fs::create_dir_all(content.parent().unwrap()).unwrap();
            fs::write(&content, "{}").unwrap();
        }
        // Directory without content.json is not listed
        fs::create_dir_all(root.join("partial").join("pages")).unwrap();

        assert_eq!(list_ingested(root), vec!["alpha", "beta"]);
        clear_document(root, "alpha").unwrap();
        assert_eq!(list_ingested(root), vec!["beta"]);
        clear_all(root).unwrap();
        assert!(list_ingested(root).is_empty());
        // Clearing a missing root is a no-op
        clear_all(root).unwrap();
    }
}
