//! Document chunking for ingestion
//!
//! Splits on structural boundaries first (section/article/chapter
//! headers), then on blank-line paragraphs, accumulating paragraphs into
//! chunks up to a target character size. Each new chunk carries the
//! trailing characters of the previous one for continuity. Paragraphs are
//! never split, so a single oversized paragraph becomes an oversized
//! chunk. Deterministic: identical input and parameters yield identical
//! chunk boundaries.

use crate::error::Result;
use regex::Regex;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const SECTION_PATTERN: &str = r"\n(?:Section|Article|Chapter|§)\s+\d+[:.]?\s*";

/// Split a document into chunks of roughly `chunk_size` characters
pub fn chunk_document(document: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let section_re = Regex::new(SECTION_PATTERN)?;

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for section in section_re.split(document) {
        for paragraph in section.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            if !current.is_empty() && current.len() + paragraph.len() > chunk_size {
                chunks.push(current.trim().to_string());
                if overlap > 0 {
                    let tail = tail_chars(&current, overlap);
                    current = format!("{} {}", tail, paragraph);
                } else {
                    current = paragraph.to_string();
                }
            } else if current.is_empty() {
                // No chunk accumulated yet: start fresh with zero overlap
                current = paragraph.to_string();
            } else {
                current.push_str("\n\n");
                current.push_str(paragraph);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    tracing::debug!("Split document into {} chunks", chunks.len());
    Ok(chunks)
}

/// Trailing `n` bytes of a string, adjusted forward to a char boundary
fn tail_chars(s: &str, n: usize) -> &str {
    if n >= s.len() {
        return s;
    }
    let mut start = s.len() - n;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(count: usize, len: usize) -> String {
        (0..count)
            .map(|i| format!("{}{}", "p", "x".repeat(len - 1).replace('x', &i.to_string()[..1])))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunks = chunk_document("Just one short paragraph.", 500, 50).unwrap();
        assert_eq!(chunks, vec!["Just one short paragraph."]);
    }

    #[test]
    fn test_accumulates_until_chunk_size() {
        let doc = paragraphs(6, 40);
        let chunks = chunk_document(&doc, 100, 10).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 100 + 10 + 2, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_overlap_carried_between_chunks() {
        let doc = "aaaa aaaa aaaa aaaa\n\nbbbb bbbb bbbb bbbb\n\ncccc cccc cccc cccc";
        let chunks = chunk_document(doc, 25, 8).unwrap();
        assert!(chunks.len() >= 2);
        // Second chunk starts with the tail of the first
        let tail: String = chunks[0].chars().rev().take(8).collect::<String>();
        let tail: String = tail.chars().rev().collect();
        assert!(chunks[1].starts_with(tail.trim()));
    }

    #[test]
    fn test_zero_overlap_fallback() {
        let doc = "first paragraph here\n\nsecond paragraph here";
        let chunks = chunk_document(doc, 20, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "first paragraph here");
        assert_eq!(chunks[1], "second paragraph here");
    }

    #[test]
    fn test_oversized_paragraph_not_split() {
        let big = "word ".repeat(100);
        let big = big.trim();
        let chunks = chunk_document(big, 50, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], big);
    }

    #[test]
    fn test_section_headers_split_first() {
        let doc = "Intro text.\nSection 1: Scope\nBody of section one.\nSection 2: Terms\nBody of section two.";
        let chunks = chunk_document(doc, 30, 0).unwrap();
        assert!(chunks.iter().any(|c| c.contains("section one")));
        assert!(chunks.iter().any(|c| c.contains("section two")));
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let doc = paragraphs(10, 60);
        let first = chunk_document(&doc, 150, 20).unwrap();
        let second = chunk_document(&doc, 150, 20).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_word_split_at_boundaries() {
        let doc = "alpha beta gamma delta\n\nepsilon zeta eta theta\n\niota kappa lambda mu";
        let chunks = chunk_document(doc, 30, 5).unwrap();
        let words = ["alpha", "epsilon", "lambda", "theta"];
        for word in words {
            assert!(
                chunks.iter().any(|c| c.contains(word)),
                "word {} lost or split",
                word
            );
        }
    }

    #[test]
    fn test_tail_chars_respects_char_boundaries() {
        let s = "héllo wörld";
        let tail = tail_chars(s, 4);
        assert!(s.ends_with(tail));
        assert!(tail.len() <= 4);
    }
}
