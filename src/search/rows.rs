/// Rows in a single batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Completed results handed to the host a fixed-size batch at a time
#[derive(Debug, Clone)]
pub struct RowBatches<T> {
    rows: Vec<T>,
    position: usize,
    batch_size: usize,
}

impl<T: Clone> RowBatches<T> {
    pub fn new(rows: Vec<T>, batch_size: usize) -> Self {
        Self {
            rows,
            position: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// Total rows, delivered or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows not yet pulled.
    pub fn remaining(&self) -> usize {
        self.rows.len() - self.position
    }

    /// Next batch as a borrowed slice; empty once everything has been delivered.
    pub fn next_batch(&mut self) -> &[T] {
        let start = self.position;
        let end = (start + self.batch_size).min(self.rows.len());
        self.position = end;
        &self.rows[start..end]
    }

    /// Every row, delivered or not.
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T: Clone> Iterator for RowBatches<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.next_batch();
        if batch.is_empty() {
            None
        } else {
            Some(batch.to_vec())
        }
    }
}
