use crate::models::DidlRecord;
use crate::traits::RecordCollector;
use serde::{Deserialize, Serialize};

/// Records gathered from one browse or search response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResult {
    pub records: Vec<DidlRecord>,
    /// Value of `NumberReturned`, if the scan got that far
    pub number_returned: Option<u32>,
    /// Elements skipped because vital data was missing
    pub rejected: usize,
}

impl BrowseResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_container()).count()
    }

    pub fn item_count(&self) -> usize {
        self.records.len() - self.container_count()
    }

    /// `(announced, found)` when the advertised count disagrees with the records.
    ///
    /// Servers under- and over-report in practice, so this is informational.
    pub fn count_mismatch(&self) -> Option<(u32, usize)> {
        match self.number_returned {
            Some(announced) if announced as usize != self.records.len() => {
                Some((announced, self.records.len()))
            }
            _ => None,
        }
    }
}

impl RecordCollector for BrowseResult {
    fn collect(&mut self, record: DidlRecord) {
        self.records.push(record);
    }

    fn announce(&mut self, number_returned: u32) {
        self.number_returned = Some(number_returned);
    }

    fn reject(&mut self) {
        self.rejected += 1;
    }
}
