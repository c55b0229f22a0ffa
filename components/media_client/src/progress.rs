use std::fmt;

/// Byte counter of one download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSession {
    received: u64,
    total: Option<u64>,
}

/// Snapshot reported after every chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub received: u64,
    pub total: Option<u64>,
    /// `received / total` as a percentage, when a total was declared
    pub percent: Option<f64>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent {
            Some(percent) => write!(f, "{}%", percent.round() as u64),
            None => write!(f, "{} bytes", self.received),
        }
    }
}

impl TransferSession {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            received: 0,
            total: total.filter(|t| *t > 0),
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn percent(&self) -> Option<f64> {
        self.total
            .map(|total| self.received as f64 / total as f64 * 100.0)
    }

    /// Account for one received chunk
    pub fn record(&mut self, chunk_len: usize) -> Progress {
        self.received += chunk_len as u64;
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            received: self.received,
            total: self.total,
            percent: self.percent(),
        }
    }
}
