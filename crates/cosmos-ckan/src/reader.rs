use serde_json::Value;

use crate::client::CkanClient;
use crate::error::CkanError;
use crate::split::InputSplit;

/// Iterates the records of one [`InputSplit`] as `(index, record)` pairs,
/// where `index` is the record's absolute position in the resource.
///
/// The split's records are fetched once, when the reader is opened.
#[derive(Debug)]
pub struct RecordReader {
    split: InputSplit,
    records: std::vec::IntoIter<Value>,
    consumed: u64,
}

impl RecordReader {
    pub async fn open(client: &CkanClient, split: InputSplit) -> Result<Self, CkanError> {
        let records = client
            .records(&split.res_id, split.first_record_index, split.length)
            .await?;
        if (records.len() as u64) < split.length {
            tracing::warn!(
                resource = %split.res_id,
                expected = split.length,
                received = records.len(),
                "split is shorter than announced"
            );
        }
        Ok(Self::from_records(split, records))
    }

    pub(crate) fn from_records(split: InputSplit, mut records: Vec<Value>) -> Self {
        records.truncate(split.length as usize);
        Self {
            split,
            records: records.into_iter(),
            consumed: 0,
        }
    }

    pub fn split(&self) -> &InputSplit {
        &self.split
    }

    /// Fraction of the split consumed so far, in `[0, 1]`. An empty split
    /// reports `0`.
    pub fn progress(&self) -> f32 {
        if self.split.length == 0 {
            0.0
        } else {
            (self.consumed as f32 / self.split.length as f32).min(1.0)
        }
    }
}

impl Iterator for RecordReader {
    type Item = (u64, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let index = self.split.first_record_index + self.consumed;
        self.consumed += 1;
        Some((index, record))
    }
}
