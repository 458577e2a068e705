/// Last-seen transaction id, bounding how far back each tick walks.
///
/// Lives in memory only. A restart begins with no watermark, so the first
/// tick after startup re-examines the whole fetch window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermark {
    last_seen: Option<String>,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// The newest-first prefix of `batch` that precedes the watermark.
    ///
    /// If the watermark is not in the batch the whole batch is unseen; ids
    /// that dropped out of the fetch window between ticks are never visited.
    pub fn unseen<'a>(&self, batch: &'a [String]) -> &'a [String] {
        let Some(seen) = self.last_seen.as_deref() else {
            return batch;
        };
        match batch.iter().position(|id| id == seen) {
            Some(idx) => &batch[..idx],
            None => batch,
        }
    }

    /// Move to the newest id of the batch. An empty batch leaves it untouched.
    pub fn advance(&mut self, batch: &[String]) {
        if let Some(newest) = batch.first() {
            self.last_seen = Some(newest.clone());
        }
    }
}
