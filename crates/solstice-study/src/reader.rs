//! Read-only views over a persisted document.
//!
//! The evaluator needs the same document in several shapes: one
//! concatenated string for quote verification, individual blocks with
//! location metadata for structured prompts, and base64 figure payloads
//! for vision-capable models. A [`DocumentReader`] derives all of them
//! from one loaded [`Document`].

use base64::Engine;
use serde::Serialize;
use serde_json::json;
use solstice_core::{Block, Document};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Output shapes the reader can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Concatenated text blocks only
    TextOnly,
    /// Concatenated text with `[FIGURE ...]` placeholders in flow position
    TextWithPlaceholders,
    /// Individual blocks with page/location metadata
    Structured,
    /// Structured plus base64-encoded figure images
    VisionReady,
}

/// One text block with its location, for structured prompts.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    /// Block ID
    pub id: String,
    /// 0-based page
    pub page_index: usize,
    /// Canonical role
    pub role: String,
    /// Block text (placeholder text for graphical blocks)
    pub text: String,
}

/// A figure/table image ready for a vision payload.
#[derive(Debug, Clone, Serialize)]
pub struct FigurePayload {
    /// Source block ID
    pub block_id: String,
    /// 0-based page
    pub page_index: usize,
    /// Image filename (relative to the figures directory)
    pub filename: String,
    /// Base64-encoded PNG, when the file could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_png: Option<String>,
}

/// Read-only view over one ingested document.
#[derive(Debug, Clone)]
pub struct DocumentReader {
    document: Document,
    extracted_dir: PathBuf,
}

impl DocumentReader {
    /// Wrap a loaded document; `extracted_dir` is where its relative
    /// `image_path`s resolve.
    #[must_use = "returns the constructed reader"]
    pub fn new(document: Document, extracted_dir: PathBuf) -> Self {
        Self {
            document,
            extracted_dir,
        }
    }

    /// The wrapped document.
    #[must_use = "returns the wrapped document"]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Concatenated text in reading order.
    ///
    /// With `TextWithPlaceholders` (and the vision formats) graphical
    /// blocks contribute their placeholder text in flow position; with
    /// `TextOnly` they are skipped. Blocks are separated by blank lines.
    #[must_use = "returns the concatenated document text"]
    pub fn full_text(&self, format: OutputFormat) -> String {
        let mut out = String::new();
        for page in 0..self.document.reading_order.len() {
            for block in self.document.page_blocks(page) {
                let include = match format {
                    OutputFormat::TextOnly => !block.role.is_graphical(),
                    _ => true,
                };
                if !include {
                    continue;
                }
                let Some(text) = block.text.as_deref() else {
                    continue;
                };
                if text.is_empty() {
                    continue;
                }
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                let _ = write!(out, "{text}");
            }
        }
        out
    }

    /// Individual blocks with location metadata, in reading order.
    #[must_use = "returns the block records"]
    pub fn block_records(&self) -> Vec<BlockRecord> {
        let mut records = Vec::with_capacity(self.document.blocks.len());
        for page in 0..self.document.reading_order.len() {
            for block in self.document.page_blocks(page) {
                records.push(BlockRecord {
                    id: block.id.clone(),
                    page_index: block.page_index,
                    role: block.role.to_string(),
                    text: block.text.clone().unwrap_or_default(),
                });
            }
        }
        records
    }

    /// Figure/table payloads, base64-encoding each image when requested.
    ///
    /// Unreadable image files degrade to entries without payload rather
    /// than failing the read.
    #[must_use = "returns the figure payloads"]
    pub fn figure_payloads(&self, encode: bool) -> Vec<FigurePayload> {
        self.document
            .blocks
            .iter()
            .filter(|b| b.role.is_graphical())
            .map(|block| self.figure_payload(block, encode))
            .collect()
    }

    fn figure_payload(&self, block: &Block, encode: bool) -> FigurePayload {
        let relative = block.image_path.clone().unwrap_or_default();
        let filename = Path::new(&relative)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let base64_png = if encode && !relative.is_empty() {
            let path = self.extracted_dir.join(&relative);
            match std::fs::read(&path) {
                Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                Err(e) => {
                    warn!(block = %block.id, error = %e, "figure image unreadable");
                    None
                }
            }
        } else {
            None
        };

        FigurePayload {
            block_id: block.id.clone(),
            page_index: block.page_index,
            filename,
            base64_png,
        }
    }

    /// Structured JSON view for prompts: document metadata plus blocks.
    #[must_use = "returns the structured document view"]
    pub fn structured(&self) -> serde_json::Value {
        json!({
            "source_pdf": self.document.source_pdf,
            "total_pages": self.document.metadata.total_pages,
            "blocks": self.block_records(),
        })
    }

    /// Find a quote in the concatenated text, returning character offsets
    /// `(start, end)`.
    #[must_use = "returns the quote's character offsets"]
    pub fn locate_quote(&self, document_text: &str, quote: &str) -> Option<(usize, usize)> {
        let byte_offset = document_text.find(quote)?;
        let start = document_text[..byte_offset].chars().count();
        let end = start + quote.chars().count();
        Some((start, end))
    }
}
