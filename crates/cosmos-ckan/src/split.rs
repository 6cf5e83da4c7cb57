use serde::{Deserialize, Serialize};

/// A contiguous slice of a resource's records: `[first_record_index,
/// first_record_index + length)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSplit {
    pub res_id: String,
    pub first_record_index: u64,
    pub length: u64,
}

impl InputSplit {
    pub fn new(res_id: impl Into<String>, first_record_index: u64, length: u64) -> Self {
        Self {
            res_id: res_id.into(),
            first_record_index,
            length,
        }
    }

    /// One past the last record index covered by the split.
    pub fn end(&self) -> u64 {
        self.first_record_index + self.length
    }
}

/// Cuts `[0, total)` into splits of `split_size` records; the last split
/// holds the remainder. A zero `split_size` is treated as one.
pub fn compute_splits(res_id: &str, total: u64, split_size: u64) -> Vec<InputSplit> {
    let size = split_size.max(1);
    let mut splits = Vec::with_capacity(total.div_ceil(size) as usize);
    let mut start = 0;
    while start < total {
        let length = size.min(total - start);
        splits.push(InputSplit::new(res_id, start, length));
        start += length;
    }
    splits
}
