//! Text cleaning and recursive character splitting.
//!
//! Splitting tries each separator in turn (paragraph, line, sentence, word,
//! character), keeping pieces under the target size and merging neighbours
//! back together with a character overlap between consecutive chunks.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use wayfarer_core::error::{Result, WayfarerError};

/// Separators tried in order, coarsest first. The empty separator splits
/// into single characters.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Cleaned text shorter than this is rejected as unreadable.
pub const MIN_TEXT_CHARS: usize = 10;

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));
static EXCESS_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]{2,}").expect("Invalid whitespace regex"));

/// A chunk of a document with its position in the cleaned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Character offset of the chunk in the cleaned text.
    pub start_char: usize,
    pub end_char: usize,
}

/// Normalise line endings and collapse runs of blank lines and spaces.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, " ");
    text.trim().to_string()
}

/// Clean `raw` and split it into chunks, rejecting text with nothing to index.
pub fn prepare_chunks(raw: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<TextChunk>> {
    let cleaned = clean_text(raw);
    if cleaned.chars().count() < MIN_TEXT_CHARS {
        return Err(WayfarerError::Ingest(
            "Document contains no readable text".to_string(),
        ));
    }
    Ok(split_text(&cleaned, chunk_size, chunk_overlap))
}

/// Split `text` into chunks of at most `chunk_size` characters (where the
/// separators allow it), with up to `chunk_overlap` characters repeated
/// between neighbours.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<TextChunk> {
    let splitter = Splitter {
        chunk_size: chunk_size.max(1),
        chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
    };
    let pieces = splitter.split(text, &SEPARATORS);
    let total_chunks = pieces.len();

    let mut cursor = 0usize;
    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, piece)| {
            // Locate the chunk in the source, searching forward from the
            // previous chunk so repeated passages map to the right place.
            let byte_start = text[cursor..]
                .find(piece.as_str())
                .map(|offset| cursor + offset)
                .or_else(|| text.find(piece.as_str()))
                .unwrap_or(0);
            cursor = byte_start;
            if let Some(c) = text[byte_start..].chars().next() {
                cursor += c.len_utf8();
            }
            let start_char = text[..byte_start].chars().count();
            let end_char = start_char + piece.chars().count();
            TextChunk {
                text: piece,
                chunk_index,
                total_chunks,
                start_char,
                end_char,
            }
        })
        .collect()
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut chosen = separators.len().saturating_sub(1);
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                chosen = i;
                break;
            }
        }
        let separator = separators.get(chosen).copied().unwrap_or("");
        let finer = separators.get(chosen + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if piece.chars().count() < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short));
                short.clear();
            }
            if finer.is_empty() {
                if let Some(piece) = non_empty_trimmed(piece) {
                    chunks.push(piece);
                }
            } else {
                chunks.extend(self.split(piece, finer));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short));
        }
        chunks
    }

    /// Greedily join short pieces up to `chunk_size`, carrying the tail of
    /// each emitted chunk (up to `chunk_overlap`) into the next one.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join(&window) {
                    out.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= front.chars().count(),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join(&window) {
            out.push(chunk);
        }
        out
    }
}

/// Split on `separator`, attaching each separator to the piece that follows it.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}

fn join(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    non_empty_trimmed(&joined)
}

fn non_empty_trimmed(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let raw = "  Kyoto\r\n\r\n\r\n\r\nTemples   and\t\tgardens\n\nTea  ";
        assert_eq!(clean_text(raw), "Kyoto\n\nTemples and gardens\n\nTea");
    }

    #[test]
    fn test_prepare_rejects_short_text() {
        assert!(prepare_chunks("  tiny \n ", 1000, 200).is_err());
        assert!(prepare_chunks("", 1000, 200).is_err());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = prepare_chunks("Lisbon is hilly. Bring good shoes.", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, chunks[0].text.chars().count());
    }

    #[test]
    fn test_chunks_respect_size() {
        let paragraph = "The old town is best explored on foot. ".repeat(20);
        let text = vec![paragraph.trim(); 6].join("\n\n");
        let chunks = split_text(&text, 1000, 200);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 1000, "chunk too large");
            assert_eq!(chunk.total_chunks, chunks.len());
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let words: Vec<String> = (0..400).map(|i| format!("word{}", i)).collect();
        let text = words.join(" ");
        let chunks = split_text(&text, 200, 50);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let first_tail = pair[0].text.split(' ').last().unwrap();
            assert!(
                pair[1].text.contains(first_tail),
                "expected overlap between consecutive chunks"
            );
            assert!(pair[1].start_char < pair[0].end_char);
        }
    }

    #[test]
    fn test_offsets_point_into_source() {
        let text = "First paragraph about Rome.\n\nSecond paragraph about Florence.";
        let chunks = split_text(text, 30, 0);
        let chars: Vec<char> = text.chars().collect();
        for chunk in &chunks {
            let slice: String = chars[chunk.start_char..chunk.end_char].iter().collect();
            assert_eq!(slice, chunk.text);
        }
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(25);
        let chunks = split_text(&text, 10, 2);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
    }

    #[test]
    fn test_multibyte_text() {
        let text = "東京の寺院。 ".repeat(50);
        let chunks = split_text(text.trim(), 40, 10);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 40));
    }
}
