//! Recursive chunking strategy

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::ingestion::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
use crate::domain::DomainError;

/// Splitting levels, coarsest first: paragraphs -> lines -> sentences -> words.
/// Anything still too large after the last level is cut by character count.
const LEVELS: usize = 4;

/// Chunking strategy that recursively splits text hierarchically and merges
/// the pieces back into windows of at most `chunk_size` characters, repeating
/// up to `chunk_overlap` characters between neighbours.
#[derive(Debug, Clone, Default)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    pub fn new() -> Self {
        Self
    }

    fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    fn separator(level: usize) -> &'static str {
        match level {
            0 => "\n\n",
            1 => "\n",
            _ => " ",
        }
    }

    fn split_level(text: &str, level: usize) -> Vec<&str> {
        let pieces: Vec<&str> = match level {
            0 => text.split("\n\n").collect(),
            1 => text.lines().collect(),
            2 => text.unicode_sentences().collect(),
            _ => text.split_whitespace().collect(),
        };

        pieces
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn split_recursive(text: &str, config: &ChunkingConfig, level: usize) -> Vec<String> {
        if level >= LEVELS {
            return Self::split_by_chars(text, config);
        }

        let separator = Self::separator(level);
        let mut result = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in Self::split_level(text, level) {
            if Self::char_len(piece) <= config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                result.extend(Self::merge(&fitting, separator, config));
                fitting.clear();
            }

            result.extend(Self::split_recursive(piece, config, level + 1));
        }

        if !fitting.is_empty() {
            result.extend(Self::merge(&fitting, separator, config));
        }

        result
    }

    /// Greedily packs pieces into windows, carrying the tail of each window
    /// into the next while it fits within the overlap budget.
    fn merge(pieces: &[&str], separator: &str, config: &ChunkingConfig) -> Vec<String> {
        let sep_len = Self::char_len(separator);
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = Self::char_len(piece);
            let joint = if window.is_empty() { 0 } else { sep_len };

            if total + len + joint > config.chunk_size && !window.is_empty() {
                merged.push(Self::join(&window, separator));

                while total > config.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { sep_len }
                            > config.chunk_size)
                {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= Self::char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }

        if !window.is_empty() {
            merged.push(Self::join(&window, separator));
        }

        merged
    }

    fn join(window: &VecDeque<&str>, separator: &str) -> String {
        window.iter().copied().collect::<Vec<_>>().join(separator)
    }

    fn split_by_chars(text: &str, config: &ChunkingConfig) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = config.chunk_size - config.chunk_overlap;
        let mut result = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + config.chunk_size).min(chars.len());
            result.push(chars[start..end].iter().collect());

            if end == chars.len() {
                break;
            }
            start += step;
        }

        result
    }

    /// Best-effort location of a chunk inside the source text, in bytes.
    fn locate(content: &str, chunk: &str, cursor: usize) -> (usize, usize) {
        let haystack = &content[cursor..];
        let needle: String = chunk.chars().take(64).collect();

        let start = haystack
            .find(chunk)
            .or_else(|| haystack.find(needle.as_str()))
            .map(|pos| cursor + pos)
            .unwrap_or(cursor);

        let mut end = (start + chunk.len()).min(content.len());
        while !content.is_char_boundary(end) {
            end -= 1;
        }

        (start, end)
    }

    fn next_cursor(content: &str, start: usize) -> usize {
        content[start..]
            .chars()
            .next()
            .map(|c| start + c.len_utf8())
            .unwrap_or(content.len())
    }
}

impl ChunkingStrategy for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        let content = content.trim();

        if content.is_empty() {
            return Ok(vec![]);
        }

        let mut texts = Self::split_recursive(content, config, 0);

        if config.min_chunk_size > 0 && texts.len() > 1 {
            texts.retain(|t| Self::char_len(t) >= config.min_chunk_size);
        }

        if texts.is_empty() {
            texts.push(content.to_string());
        }

        let total = texts.len();
        let mut cursor = 0;
        let mut chunks = Vec::with_capacity(total);

        for (index, text) in texts.into_iter().enumerate() {
            let (start, end) = Self::locate(content, &text, cursor);
            cursor = Self::next_cursor(content, start);
            chunks.push(Chunk::new(text, ChunkMetadata::new(index, total, start, end)));
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}
