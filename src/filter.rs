// src/filter.rs

//! Structural filter deciding which substructures stay out of a DIP
//!
//! Two package shapes show up in practice:
//!
//! - **Submission**: the AIP carries a single top-level `submission`
//!   substructure holding the original SIP. It is dropped entirely.
//! - **Representation**: the AIP carries several named representations and
//!   the preservation copies (`<name>-preservation`) are dropped while the
//!   access representations are kept.
//!
//! The same predicate is applied to `fileGrp/@USE`, `div/@LABEL` and to
//! directory names during replication so a substructure disappears from the
//! file tree and the METS document together.

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

const SUBMISSION_TOKEN: &str = "submission";
const PRESERVATION_SUFFIX: &str = "-preservation";

/// Which substructures a conversion excludes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionMode {
    /// Drop the submission substructure (`USE`/`LABEL` starting with "submission")
    #[default]
    Submission,
    /// Drop preservation representations (`USE`/`LABEL` ending with "-preservation")
    Representation,
}

impl ExclusionMode {
    /// Whether a classification value (`USE`, `LABEL` or a directory name)
    /// denotes an excluded substructure
    pub fn is_excluded(self, classification: &str) -> bool {
        match self {
            Self::Submission => starts_with_ignore_case(classification, SUBMISSION_TOKEN),
            Self::Representation => ends_with_ignore_case(classification, PRESERVATION_SUFFIX),
        }
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Representation => "representation",
        }
    }
}

impl fmt::Display for ExclusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn starts_with_ignore_case(value: &str, token: &str) -> bool {
    value
        .get(..token.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(token))
}

fn ends_with_ignore_case(value: &str, token: &str) -> bool {
    value
        .len()
        .checked_sub(token.len())
        .and_then(|start| value.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(token))
}
