//! Chunk extraction from formatted Score/Content blocks
//!
//! Evaluation input arrives as repeated `Score: <s>\nContent: <c>\n\n`
//! blocks. Real inputs drift from that shape, so extraction runs a fixed
//! order of strategies and the first one that yields chunks wins.

use crate::error::{Result, SiftError};
use regex::Regex;

/// Parsing strategies in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Blocks whose content runs to the next blank-line-separated Score: header
    BlankLineBlocks,

    /// Blocks whose content runs to the next Score: occurrence anywhere
    ScoreTerminated,

    /// Blank-line blocks restricted to numeric Score: headers
    NumericScoreBlocks,

    /// Content-keyed lines with continuation lines that are not Score: lines
    ContentLines,
}

impl ParseStrategy {
    /// Attempt order; first strategy yielding at least one chunk wins
    pub const ORDER: [ParseStrategy; 4] = [
        ParseStrategy::BlankLineBlocks,
        ParseStrategy::ScoreTerminated,
        ParseStrategy::NumericScoreBlocks,
        ParseStrategy::ContentLines,
    ];
}

/// What the parser saw when every strategy came up empty
#[derive(Debug, Clone)]
pub struct ParseDiagnostics {
    /// Input length in characters
    pub input_length: usize,
    pub contains_score: bool,
    pub contains_content: bool,
    /// First 200 characters of the input
    pub preview: String,
}

impl ParseDiagnostics {
    fn capture(text: &str) -> Self {
        Self {
            input_length: text.chars().count(),
            contains_score: text.contains("Score:"),
            contains_content: text.contains("Content:"),
            preview: text.chars().take(200).collect(),
        }
    }
}

/// Outcome of a parse attempt
#[derive(Debug, Clone)]
pub enum ChunkParse {
    /// At least one chunk, tagged with the strategy that produced it
    Parsed {
        chunks: Vec<String>,
        strategy: ParseStrategy,
    },

    /// Every strategy came up empty
    NoChunks { diagnostics: ParseDiagnostics },
}

/// Extracts content chunks from formatted evaluation blocks
pub struct ChunkParser {
    block_header: Regex,
    numeric_header: Regex,
}

impl ChunkParser {
    pub fn new() -> Result<Self> {
        let block_header = Regex::new(r"(?s)Score:.*?\nContent:[ \t]*")
            .map_err(|e| SiftError::Config(format!("Invalid chunk header pattern: {}", e)))?;
        let numeric_header = Regex::new(r"Score:[ \t]*[0-9.]+[ \t]*\nContent:[ \t]*")
            .map_err(|e| SiftError::Config(format!("Invalid chunk header pattern: {}", e)))?;

        Ok(Self {
            block_header,
            numeric_header,
        })
    }

    /// Parse an evaluation block into trimmed, non-empty chunks
    pub fn parse(&self, text: &str) -> ChunkParse {
        for strategy in ParseStrategy::ORDER {
            let chunks = self.run_strategy(strategy, text);
            if !chunks.is_empty() {
                return ChunkParse::Parsed { chunks, strategy };
            }
        }

        ChunkParse::NoChunks {
            diagnostics: ParseDiagnostics::capture(text),
        }
    }

    /// Run a single strategy in isolation
    pub fn run_strategy(&self, strategy: ParseStrategy, text: &str) -> Vec<String> {
        match strategy {
            ParseStrategy::BlankLineBlocks => scan_blocks(text, &self.block_header, "\n\nScore:"),
            ParseStrategy::ScoreTerminated => scan_blocks(text, &self.block_header, "Score:"),
            ParseStrategy::NumericScoreBlocks => {
                scan_blocks(text, &self.numeric_header, "\n\nScore:")
            }
            ParseStrategy::ContentLines => content_lines(text),
        }
    }
}

/// Sequentially locate headers and slice each content span up to the
/// separator or end of input
fn scan_blocks(text: &str, header: &Regex, separator: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while let Some(found) = header.find_at(text, pos) {
        let content_start = found.end();
        let content_end = match text[content_start..].find(separator) {
            Some(offset) => content_start + offset,
            None => text.len(),
        };

        let chunk = text[content_start..content_end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        // Resume scanning where this block's content stopped
        pos = content_end.max(found.end());
        if pos >= text.len() {
            break;
        }
    }

    chunks
}

/// Permissive fallback: each Content: line starts a chunk that absorbs
/// following lines until a Score: line or the next Content: line
fn content_lines(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Option<String> = None;

    let finish = |chunk: Option<String>, chunks: &mut Vec<String>| {
        if let Some(chunk) = chunk {
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        }
    };

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Content:") {
            finish(current.take(), &mut chunks);
            current = Some(rest.trim_start().to_string());
        } else if line.starts_with("Score:") {
            finish(current.take(), &mut chunks);
        } else if let Some(chunk) = current.as_mut() {
            chunk.push('\n');
            chunk.push_str(line);
        }
    }
    finish(current, &mut chunks);

    chunks
}
