// src/package.rs

//! DIP package assembly
//!
//! Orders the steps of one conversion:
//!
//! 1. Validate the AIP directory (must contain `representations/`)
//! 2. Allocate a fresh package id (`uuid-<v4>`)
//! 3. Rewrite the AIP's METS in memory, so document errors surface before
//!    anything is written
//! 4. Replicate the tree into `<output>/<package id>/` with exclusions
//! 5. Write the rewritten METS over the copied one
//!
//! Steps 4 and 5 are transactional: if either fails, the partially created
//! package directory is removed before the error is returned.

use crate::error::{Error, Result};
use crate::filter::ExclusionMode;
use crate::identifier::{new_package_id, IdRemapper};
use crate::mets::{
    transform, TransformOptions, TransformReport, XmlDocument, DEFAULT_INDENT, DIP_PROFILE,
    METS_FILE_NAME,
};
use crate::replicate::{Exclusion, ReplicationStats, TreeReplicator, REPRESENTATIONS_DIR};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for AIP to DIP conversion
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Which substructures are left out
    pub mode: ExclusionMode,
    /// File name of the package-root METS document
    pub metadata_file: String,
    /// Profile URI written to the DIP METS root
    pub profile: String,
    /// Spaces per indentation level of the written METS
    pub indent: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            mode: ExclusionMode::default(),
            metadata_file: METS_FILE_NAME.to_string(),
            profile: DIP_PROFILE.to_string(),
            indent: DEFAULT_INDENT,
        }
    }
}

/// Result of converting one AIP
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Identifier of the new DIP (also its directory name)
    pub package_id: String,
    /// Directory holding the DIP
    pub package_dir: PathBuf,
    /// What the METS rewrite changed
    pub report: TransformReport,
    /// What the tree copy did
    pub replication: ReplicationStats,
}

/// Check that `aip_dir` is a directory containing `representations/`
pub fn validate_aip(aip_dir: &Path) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidInputPackage {
        path: aip_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    if !aip_dir.exists() {
        return Err(invalid("directory does not exist"));
    }
    if !aip_dir.is_dir() {
        return Err(invalid("not a directory"));
    }
    if !aip_dir.join(REPRESENTATIONS_DIR).is_dir() {
        return Err(invalid("missing representations directory"));
    }
    Ok(())
}

/// Make sure `output_dir` exists as a directory, creating it if missing
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }
    if output_dir.exists() {
        return Err(Error::InvalidOutputDirectory {
            path: output_dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    info!("Creating output directory: {}", output_dir.display());
    fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))
}

/// Converts AIP directories into DIP directories
#[derive(Debug, Clone, Default)]
pub struct PackageAssembler {
    options: ConversionOptions,
}

impl PackageAssembler {
    /// Create an assembler with the given options
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    /// Create an assembler with default options
    pub fn with_defaults() -> Self {
        Self::new(ConversionOptions::default())
    }

    /// Options in use
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert `aip_dir` into a new DIP under `output_dir`
    pub fn convert(&self, aip_dir: &Path, output_dir: &Path) -> Result<ConversionResult> {
        self.convert_as(aip_dir, output_dir, &new_package_id())
    }

    /// Convert `aip_dir` into a DIP with a caller-chosen package id
    ///
    /// An existing `<output_dir>/<package_id>` is replaced.
    pub fn convert_as(
        &self,
        aip_dir: &Path,
        output_dir: &Path,
        package_id: &str,
    ) -> Result<ConversionResult> {
        validate_aip(aip_dir)?;
        prepare_output_dir(output_dir)?;
        info!(
            "Converting {} to DIP {} ({} mode)",
            aip_dir.display(),
            package_id,
            self.options.mode
        );

        let mut ids = IdRemapper::new();
        if let Some(aip_name) = package_name(aip_dir) {
            ids.seed(aip_name, package_id);
        }

        let mets_path = aip_dir.join(&self.options.metadata_file);
        if !mets_path.is_file() {
            return Err(Error::InvalidInputPackage {
                path: aip_dir.to_path_buf(),
                reason: format!("missing {}", self.options.metadata_file),
            });
        }

        let mut doc = XmlDocument::read(&mets_path)?;
        let transform_options = TransformOptions {
            mode: self.options.mode,
            profile: self.options.profile.clone(),
        };
        let report = transform(&mut doc, package_id, &transform_options, &mut ids)?;
        let xml = doc.to_xml(self.options.indent)?;
        debug!("Remapped {} identifiers", ids.len());

        let package_dir = output_dir.join(package_id);
        clear_destination(&package_dir)?;

        let replication = match self.populate(aip_dir, output_dir, &package_dir, &xml) {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Conversion failed, removing {}", package_dir.display());
                if let Err(cleanup) = fs::remove_dir_all(&package_dir) {
                    warn!("Failed to remove {}: {}", package_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "DIP {} written: {} ids remapped, {} file groups and {} divisions removed",
            package_id,
            report.remapped_ids,
            report.removed_file_groups.len(),
            report.removed_divisions.len()
        );

        Ok(ConversionResult {
            package_id: package_id.to_string(),
            package_dir,
            report,
            replication,
        })
    }

    /// Copy the tree and write the rewritten METS
    fn populate(
        &self,
        aip_dir: &Path,
        output_dir: &Path,
        package_dir: &Path,
        xml: &str,
    ) -> Result<ReplicationStats> {
        fs::create_dir_all(package_dir).map_err(|e| Error::io(package_dir, e))?;

        let mut replicator =
            TreeReplicator::with_exclusions(Exclusion::for_mode(self.options.mode));
        let nested = nested_output(aip_dir, output_dir)
            .or_else(|| nested_output(aip_dir, package_dir));
        if let Some(nested) = nested {
            debug!("Output lies inside the AIP, excluding {}", nested.display());
            replicator = replicator.exclude(Exclusion::Path(nested));
        }

        let stats = replicator.replicate(aip_dir, package_dir)?;

        let mets_path = package_dir.join(&self.options.metadata_file);
        fs::write(&mets_path, xml).map_err(|e| Error::io(&mets_path, e))?;
        info!("METS written in: {}", package_dir.display());
        Ok(stats)
    }
}

/// Directory name of the AIP, which is its package identifier
fn package_name(aip_dir: &Path) -> Option<String> {
    let canonical = aip_dir.canonicalize().ok()?;
    canonical
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Relative path of `dir` inside `aip_dir`, if it is nested there
fn nested_output(aip_dir: &Path, dir: &Path) -> Option<PathBuf> {
    let aip = aip_dir.canonicalize().ok()?;
    let output = dir.canonicalize().ok()?;
    output
        .strip_prefix(&aip)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Remove a previous package with the same id
fn clear_destination(package_dir: &Path) -> Result<()> {
    if !package_dir.exists() {
        return Ok(());
    }

    info!("Overwriting {}", package_dir.display());
    let removed = if package_dir.is_dir() {
        fs::remove_dir_all(package_dir)
    } else {
        fs::remove_file(package_dir)
    };
    removed.map_err(|e| {
        warn!("Cannot clear {}: {}", package_dir.display(), e);
        Error::OutputCollision(package_dir.to_path_buf())
    })
}
