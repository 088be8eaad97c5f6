use std::{fmt::Display, time::Duration};

/// Timings of one benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Wall-clock time from the opened session to the closed session
    total: Duration,
    /// Time spent inside insert calls only
    insert: Duration,
    /// Number of tablets inserted
    batches: usize,
}

impl RunReport {
    pub fn new(total: Duration, insert: Duration, batches: usize) -> Self {
        Self {
            total,
            insert,
            batches,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn insert(&self) -> Duration {
        self.insert
    }

    pub fn batches(&self) -> usize {
        self.batches
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "All executions done!!")?;
        writeln!(f, "use time: {:.3}", self.total.as_secs_f64())?;
        write!(f, "insert time: {:.3}", self.insert.as_secs_f64())
    }
}
