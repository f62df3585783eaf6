//! Rule document splitting.
//!
//! Works on chars, not bytes: rule documents are mostly CJK text, where a
//! byte offset would land inside a code point.

use copyguard_core::error::{CopyGuardError, Result};

/// Sentence terminators, CJK and ASCII.
const SENTENCE_ENDS: &[char] = &['。', '！', '？', '；', '.', '!', '?', ';'];

/// Sliding-window splitter with overlapping chunks.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(CopyGuardError::Config(format!(
                "invalid splitter: chunk_size={chunk_size}, chunk_overlap={chunk_overlap}"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks of at most `chunk_size` chars.
    ///
    /// Consecutive chunks share `chunk_overlap` chars. Every cut lies past
    /// the previous chunk's overlap window, so the window always advances.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        if chars.len() <= self.chunk_size {
            return vec![chars.iter().collect()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            let cut = if end < chars.len() {
                find_break(&chars, start + self.chunk_overlap + 1, end).unwrap_or(end)
            } else {
                end
            };

            let chunk: String = chars[start..cut].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if cut >= chars.len() {
                break;
            }
            start = cut - self.chunk_overlap;
        }
        chunks
    }
}

/// Best cut position in `lo..=hi`, by preference: paragraph, line,
/// sentence, whitespace. A cut `b` ends the chunk before `chars[b]`.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    if lo > hi {
        return None;
    }
    let accepts = |tier: usize, b: usize| -> bool {
        let prev = chars[b - 1];
        match tier {
            0 => b >= 2 && chars[b - 2] == '\n' && prev == '\n',
            1 => prev == '\n',
            2 => SENTENCE_ENDS.contains(&prev),
            _ => prev.is_whitespace(),
        }
    };
    (0..4).find_map(|tier| (lo.max(1)..=hi).rev().find(|&b| accepts(tier, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(100, 20).is_ok());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = TextSplitter::default().split("  绝对化用语禁止使用。 ");
        assert_eq!(chunks, vec!["绝对化用语禁止使用。".to_string()]);
        assert!(TextSplitter::default().split(" \n ").is_empty());
    }

    #[test]
    fn test_hard_cuts_overlap_exactly() {
        let text = "禁".repeat(2500);
        let splitter = TextSplitter::default();
        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 900]);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let para_a = "a".repeat(60);
        let para_b = "b".repeat(60);
        let text = format!("{para_a}\n\n{para_b}");
        let splitter = TextSplitter::new(80, 10).unwrap();
        let chunks = splitter.split(&text);
        assert_eq!(chunks[0], para_a);
        assert!(chunks.last().unwrap().ends_with(&para_b));
    }

    #[test]
    fn test_prefers_cjk_sentence_break() {
        let text = format!("{}。{}", "根".repeat(50), "治".repeat(50));
        let splitter = TextSplitter::new(70, 10).unwrap();
        let chunks = splitter.split(&text);
        assert!(chunks[0].ends_with('。'));
        assert_eq!(chunks[0].chars().count(), 51);
    }

    #[test]
    fn test_always_advances() {
        // Breaks only inside the overlap window must not stall the splitter.
        let text = format!("ab\n{}", "x".repeat(500));
        let splitter = TextSplitter::new(50, 45).unwrap();
        let chunks = splitter.split(&text);
        assert!(!chunks.is_empty());
        assert!(chunks.last().unwrap().ends_with('x'));
        assert!(chunks.len() < 500);
    }
}
