//! Run output: CSV streams and the stdout-mirroring run log
//!
//! Every user-visible narrative line (day headers, person decisions,
//! observation records) goes through a [`TeeLog`], which writes it to stdout
//! and to the run's log file with identical content.

use crate::error::ScenarioResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A log stream mirroring stdout into a file
#[derive(Debug)]
pub struct TeeLog {
    file: BufWriter<File>,
}

impl TeeLog {
    /// Create (truncate) the log file
    pub fn create(path: &Path) -> ScenarioResult<Self> {
        Ok(Self {
            file: BufWriter::new(File::create(path)?),
        })
    }

    /// Emit one line to stdout and the log file
    pub fn line(&mut self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        println!("{}", msg);
        // A failed log write must not abort the run
        let _ = writeln!(self.file, "{}", msg);
    }

    /// Flush the file side
    pub fn flush(&mut self) {
        let _ = self.file.flush();
    }
}

impl Drop for TeeLog {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Create a CSV file and write its header line
pub fn create_csv(path: &Path, header: &str) -> ScenarioResult<BufWriter<File>> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", header)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_log_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");
        {
            let mut log = TeeLog::create(&path).unwrap();
            log.line("first");
            log.line(format!("day {}", 3));
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "first\nday 3\n");
    }

    #[test]
    fn test_create_csv_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        {
            let mut out = create_csv(&path, "A,B,C").unwrap();
            writeln!(out, "1,2,3").unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "A,B,C\n1,2,3\n");
    }
}
