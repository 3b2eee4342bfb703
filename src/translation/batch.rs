/*!
 * Fixed-size, non-overlapping batches of subtitle entries.
 *
 * A batch is the unit of dispatch to the translation client and the unit of
 * failure for the pipeline.
 */

use crate::subtitle_processor::{clean_subtitle_text, SubtitleEntry};

/// Contiguous slice of the ordered entry sequence
#[derive(Debug, Clone)]
pub struct Batch {
    /// 1-based batch number
    pub number: usize,
    /// Position of the first entry in the full sequence
    pub offset: usize,
    /// Entries in original order
    pub entries: Vec<SubtitleEntry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry texts with markup removed, ready to leave the document layer
    pub fn cleaned_texts(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| clean_subtitle_text(&entry.text))
            .collect()
    }
}

/// Split `entries` into batches of `batch_size` (the last one may be shorter)
pub fn partition(entries: &[SubtitleEntry], batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);

    entries
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            number: i + 1,
            offset: i * batch_size,
            entries: chunk.to_vec(),
        })
        .collect()
}

/// Number of batches `partition` produces for `total` entries
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}
