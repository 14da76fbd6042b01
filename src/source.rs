// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Line sources for bulk builds.
//!
//! A [`LineSource`] is the "full ordered row source" consumed by
//! `build`/`rebuild`: a stream of raw delimited lines whose first non-empty
//! line is the header. Sources must be re-scannable because the two-phase
//! build counts the stream before replaying it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::traits::SummaryError;

/// A re-scannable stream of raw lines.
///
/// Each `scan` starts over from the first line. Opening a source that cannot
/// be read fails with [`SummaryError::SourceUnavailable`]; a read failure
/// mid-scan surfaces through the iterator and aborts the build outright.
pub trait LineSource: Send + Sync {
    fn scan(&self) -> Result<Box<dyn Iterator<Item = io::Result<String>> + '_>, SummaryError>;
}

/// A line source backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for FileSource {
    fn scan(&self) -> Result<Box<dyn Iterator<Item = io::Result<String>> + '_>, SummaryError> {
        let file = File::open(&self.path).map_err(|e| {
            SummaryError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Box::new(BufReader::new(file).lines()))
    }
}

/// An in-memory line source, used by tests and for bootstrapping summaries
/// from data already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Builds a source from one newline-separated block of text.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| l.to_string()).collect(),
        }
    }
}

impl LineSource for MemorySource {
    fn scan(&self) -> Result<Box<dyn Iterator<Item = io::Result<String>> + '_>, SummaryError> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }
}

/// Unwraps one scanned line, mapping a mid-scan read failure to
/// [`SummaryError::SourceUnavailable`].
pub(crate) fn read_line(line: io::Result<String>) -> Result<String, SummaryError> {
    line.map_err(|e| SummaryError::SourceUnavailable(e.to_string()))
}
