//! # Error Types
//!
//! This module defines all error types for score comparison and merging.
//!
//! ## Error Types
//! - `StructuralMismatch` - The two scores cannot be aligned (fatal, no report is produced)
//! - `NoCurrentDifference` - A session was queried or decided after it finished
//! - `MusicXml` - A MusicXML document could not be read
//! - `Io` - A score, preview or decision log file could not be read or written
//! - `Config` - The YAML configuration file is malformed
//! - `Preview` - The external viewer could not be launched
//! - `Replay` - A saved decision log does not fit the difference report
//! - `Json` - A difference report could not be encoded as JSON
//!
//! A keep-second decision that finds no matching slot in the merged score is *not* an
//! error: the session reports it as [`crate::session::Materialization::Missed`] and
//! carries on.
//!
//! ## Usage
//! ```rust,no_run
//! use musicmerge::{compare, parse_musicxml, MergeError};
//!
//! # let (xml_a, xml_b) = (String::new(), String::new());
//! let a = parse_musicxml(&xml_a)?;
//! let b = parse_musicxml(&xml_b)?;
//! match compare(&a, &b) {
//!     Ok(report) => println!("{} differing measures", report.len()),
//!     Err(MergeError::StructuralMismatch(mismatch)) => {
//!         eprintln!("Scores cannot be merged: {}", mismatch);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # Ok::<(), MergeError>(())
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    /// The two scores have different shapes.
    ///
    /// # Example
    /// ```
    /// # use musicmerge::{MergeError, StructuralMismatch};
    /// let err = MergeError::from(StructuralMismatch::PartCount { first: 2, second: 3 });
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Structural mismatch: first score has 2 parts, second score has 3"
    /// );
    /// ```
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(#[from] StructuralMismatch),

    /// The session is `Complete` or `Cancelled`, so there is no current difference.
    #[error("No current difference: the merge session has finished")]
    NoCurrentDifference,

    /// MusicXML parse error with the byte offset where reading stopped.
    #[error("MusicXML error at byte {position}: {message}")]
    MusicXml { position: usize, message: String },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration file.
    ///
    /// # Example
    /// ```
    /// # use musicmerge::MergeError;
    /// let err = MergeError::Config("unknown field `viewr`".to_string());
    /// assert_eq!(err.to_string(), "Invalid config: unknown field `viewr`");
    /// ```
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Preview failed: {0}")]
    Preview(String),

    #[error("Cannot replay decisions: {0}")]
    Replay(String),

    #[error("Cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MergeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Ways in which two scores fail to line up part-for-part and measure-for-measure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralMismatch {
    #[error("first score has {first} parts, second score has {second}")]
    PartCount { first: usize, second: usize },

    #[error("part '{part_id}' is missing from the second score")]
    MissingPart { part_id: String },

    #[error("part '{part}' has {first} measures in the first score and {second} in the second")]
    MeasureCount {
        part: String,
        first: usize,
        second: usize,
    },

    #[error("measure {number} of part '{part}' is missing from the second score")]
    MissingMeasure { part: String, number: u32 },
}
