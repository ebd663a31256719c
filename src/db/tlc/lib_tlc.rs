use std::fmt;

use crate::interval::month::Month;

/// DBFS folder all raw files land in.
pub const RAW_DATA_FOLDER: &str = "raw_data_files";

/// CloudFront distribution serving the NYC TLC public data.
pub const TLC_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net";

/// What happened to one download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The destination already existed, nothing was fetched.
    Skipped,
    Saved,
    /// The server answered with something other than 200.
    HttpStatus(u16),
    /// Staging or committing the file failed.
    Failed(String),
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Skipped => write!(f, "skipped"),
            DownloadOutcome::Saved => write!(f, "saved"),
            DownloadOutcome::HttpStatus(status) => write!(f, "HTTP status {}", status),
            DownloadOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcomes of a batch run, in the order the months were visited.
#[derive(Debug, Default, PartialEq)]
pub struct BatchReport {
    pub months: Vec<(Month, DownloadOutcome)>,
}

impl BatchReport {
    pub fn push(&mut self, month: Month, outcome: DownloadOutcome) {
        self.months.push((month, outcome));
    }

    pub fn saved(&self) -> usize {
        self.count(|o| *o == DownloadOutcome::Saved)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == DownloadOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                DownloadOutcome::HttpStatus(_) | DownloadOutcome::Failed(_)
            )
        })
    }

    pub fn outcome(&self, month: Month) -> Option<&DownloadOutcome> {
        self.months.iter().find(|(m, _)| *m == month).map(|(_, o)| o)
    }

    fn count<F: Fn(&DownloadOutcome) -> bool>(&self, f: F) -> usize {
        self.months.iter().filter(|(_, o)| f(o)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} months: {} saved, {} skipped, {} failed",
            self.months.len(),
            self.saved(),
            self.skipped(),
            self.failed()
        )
    }
}
