use super::ChunkerError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SENTENCE_WINDOW_DEFAULT_SIZE: usize = 1000;
const SENTENCE_WINDOW_DEFAULT_OVERLAP: usize = 200;

/// Sequences after which a chunk is allowed to end early.
pub const DEFAULT_ENDINGS: &[&str] = &[". ", "! ", "? ", "\n\n"];

/// Sliding window that prefers to end chunks on sentence stops.
///
/// `size` and `overlap` are measured in characters, not bytes, so inputs with
/// multi-byte text (e.g. CJK) chunk the same way as ASCII.
///
/// For every window `[start, start + size)` the chunker looks for the last
/// occurrence of each of the `endings` inside the window and cuts right after
/// the one closest to the window end. A cut is only taken if it leaves more
/// than `overlap` characters in the chunk, otherwise the window is cut at
/// `size`. The next window starts `overlap` characters before the previous cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceWindow {
    pub size: usize,
    pub overlap: usize,
    pub endings: Vec<String>,
}

impl SentenceWindow {
    /// Create a new `SentenceWindow` chunker with the default endings.
    /// Errors if `size` is 0 or `overlap` is not less than `size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if size == 0 {
            return Err(ChunkerError::Config("size must be greater than 0".to_string()));
        }
        if overlap >= size {
            return Err(ChunkerError::Config(
                "overlap must be less than size".to_string(),
            ));
        }
        Ok(Self {
            size,
            overlap,
            endings: DEFAULT_ENDINGS.iter().map(|e| e.to_string()).collect(),
        })
    }

    /// Replace the sequences the chunker snaps to.
    pub fn with_endings(mut self, endings: Vec<String>) -> Self {
        self.endings = endings;
        self
    }
}

impl Default for SentenceWindow {
    fn default() -> Self {
        Self::new(SENTENCE_WINDOW_DEFAULT_SIZE, SENTENCE_WINDOW_DEFAULT_OVERLAP)
            .expect("overlap is greater than size")
    }
}

impl SentenceWindow {
    pub fn chunk(&self, input: &str) -> Vec<String> {
        let SentenceWindow {
            size,
            overlap,
            endings,
        } = self;

        if input.is_empty() {
            return vec![];
        }

        let chars: Vec<char> = input.chars().collect();
        let endings: Vec<Vec<char>> = endings.iter().map(|e| e.chars().collect()).collect();
        let total = chars.len();

        let mut chunks = vec![];
        let mut start = 0;

        while start < total {
            let mut end = start + size;
            let last = end >= total;

            if last {
                end = total;
            } else if let Some(cut) = snap(&chars[..end], start, &endings) {
                if cut > start + overlap {
                    end = cut;
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if last {
                break;
            }

            start = (start + 1).max(end - overlap);
        }

        if !chunks.is_empty() {
            debug!(
                "Chunked {} chunks, avg chunk size: {}",
                chunks.len(),
                chunks.iter().fold(0, |acc, el| acc + el.chars().count()) / chunks.len()
            );
        }

        chunks
    }
}

/// Find the cut position right after the ending that finishes closest to the
/// end of `window`, considering only endings that begin after `start`.
fn snap(window: &[char], start: usize, endings: &[Vec<char>]) -> Option<usize> {
    endings
        .iter()
        .filter(|ending| !ending.is_empty() && ending.len() <= window.len())
        .filter_map(|ending| {
            (start + 1..=window.len() - ending.len())
                .rev()
                .find(|&i| window[i..i + ending.len()] == ending[..])
                .map(|i| i + ending.len())
        })
        .max()
}
