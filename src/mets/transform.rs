// src/mets/transform.rs

//! AIP → DIP rewrite of a package-root METS document
//!
//! One pass over the document:
//!
//! 1. Package identity: `OBJID` becomes the new package id, `PROFILE` the DIP
//!    profile.
//! 2. Header: `RECORDSTATUS="Current"`, `csip:OAISPACKAGETYPE="DIP"`.
//! 3. Descriptive and administrative metadata sections get new ids.
//! 4. The file section, its groups and files get new ids; groups classified
//!    as excluded are removed.
//! 5. Each structural map and its root division get new ids (the root label
//!    is the package id and is remapped too).
//! 6. Top-level divisions get new ids and references; excluded divisions are
//!    removed with everything below them; pointers left referencing a removed
//!    file group are dropped.
//!
//! All steps share one [`IdRemapper`], so a `FILEID` or `DMDID` resolves to
//! the same new value its target received, regardless of which section was
//! visited first.

use crate::error::{Error, Result};
use crate::filter::ExclusionMode;
use crate::identifier::IdRemapper;
use crate::mets::namespace::{NamespaceTable, QName, CSIP_NS, METS_NS, XLINK_NS};
use crate::mets::tree::{Element, XmlDocument};
use std::collections::HashSet;
use tracing::debug;

/// Profile URI of the E-ARK DIP specification
pub const DIP_PROFILE: &str = "https://earkdip.dilcis.eu/profile/E-ARK-DIP.xml";
/// Header record status of the rewritten document
pub const RECORD_STATUS_CURRENT: &str = "Current";
/// OAIS package type of the rewritten document
pub const DIP_PACKAGE_TYPE: &str = "DIP";

const ID: &str = "ID";
const USE: &str = "USE";
const LABEL: &str = "LABEL";
const DMDID: &str = "DMDID";
const ADMID: &str = "ADMID";
const FILEID: &str = "FILEID";

/// Options for [`transform`]
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Which substructures are removed
    pub mode: ExclusionMode,
    /// Value written to the root `PROFILE` attribute
    pub profile: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            mode: ExclusionMode::default(),
            profile: DIP_PROFILE.to_string(),
        }
    }
}

/// Summary of what a transform changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Identifiers newly remapped during this pass
    pub remapped_ids: usize,
    /// `USE` values of removed file groups
    pub removed_file_groups: Vec<String>,
    /// `LABEL` values of removed divisions
    pub removed_divisions: Vec<String>,
    /// File/package pointers dropped because their target was removed
    pub removed_pointers: usize,
}

/// Element and attribute names as spelled in the document being rewritten
struct MetsNames {
    mets_hdr: QName,
    dmd_sec: QName,
    amd_sec: QName,
    file_sec: QName,
    file_grp: QName,
    file: QName,
    struct_map: QName,
    div: QName,
    mptr: QName,
    fptr: QName,
    package_type: String,
    xlink_title: Option<String>,
}

impl MetsNames {
    fn resolve(ns: &NamespaceTable) -> Result<Self> {
        let mets = |local: &str| ns.require_element(METS_NS, local);
        Ok(Self {
            mets_hdr: mets("metsHdr")?,
            dmd_sec: mets("dmdSec")?,
            amd_sec: mets("amdSec")?,
            file_sec: mets("fileSec")?,
            file_grp: mets("fileGrp")?,
            file: mets("file")?,
            struct_map: mets("structMap")?,
            div: mets("div")?,
            mptr: mets("mptr")?,
            fptr: mets("fptr")?,
            package_type: ns.require_attribute(CSIP_NS, "OAISPACKAGETYPE")?.raw(),
            xlink_title: ns.attribute(XLINK_NS, "title").map(|name| name.raw()),
        })
    }
}

/// Rewrite `doc` in place as the METS document of DIP `package_id`
///
/// `ids` must be the remapper of the whole conversion run (seeded with the
/// package's old → new identity). On error the document is left partially
/// edited and must be discarded.
pub fn transform(
    doc: &mut XmlDocument,
    package_id: &str,
    options: &TransformOptions,
    ids: &mut IdRemapper,
) -> Result<TransformReport> {
    let (root, ns) = doc.split_mut();
    let names = MetsNames::resolve(ns)?;
    let mut report = TransformReport::default();
    let before = ids.len();

    rewrite_identity(root, package_id, &options.profile, ids);
    rewrite_header(root, &names)?;
    remap_metadata_sections(root, &names, ids)?;
    let pruned = rewrite_file_section(root, &names, options.mode, ids, &mut report)?;
    rewrite_struct_maps(root, &names, options.mode, ids, &pruned, &mut report)?;

    report.remapped_ids = ids.len() - before;
    Ok(report)
}

fn rewrite_identity(root: &mut Element, package_id: &str, profile: &str, ids: &mut IdRemapper) {
    if let Some(old) = root.attr("OBJID") {
        ids.seed(old, package_id);
    }
    root.set_attr("OBJID", package_id);
    root.set_attr("PROFILE", profile);
}

fn rewrite_header(root: &mut Element, names: &MetsNames) -> Result<()> {
    let header = root.required_child_mut(&names.mets_hdr)?;
    header.set_attr("RECORDSTATUS", RECORD_STATUS_CURRENT);
    header.set_attr(&names.package_type, DIP_PACKAGE_TYPE);
    Ok(())
}

fn remap_attr(element: &mut Element, attr: &str, ids: &mut IdRemapper) -> Result<(String, String)> {
    let old = element.required_attr(attr)?.to_string();
    let new = ids.remap(&old)?;
    element.set_attr(attr, new.clone());
    Ok((old, new))
}

fn remap_refs_attr(element: &mut Element, attr: &str, ids: &mut IdRemapper) -> Result<()> {
    if let Some(refs) = element.attr(attr) {
        let remapped = ids.remap_refs(refs)?;
        element.set_attr(attr, remapped);
    }
    Ok(())
}

fn remap_metadata_sections(
    root: &mut Element,
    names: &MetsNames,
    ids: &mut IdRemapper,
) -> Result<()> {
    for dmd_sec in root.children_named_mut(&names.dmd_sec) {
        remap_attr(dmd_sec, ID, ids)?;
    }

    for amd_sec in root.children_named_mut(&names.amd_sec) {
        if amd_sec.attr(ID).is_some() {
            remap_attr(amd_sec, ID, ids)?;
        }
        // techMD, rightsMD, sourceMD, digiprovMD
        for section in amd_sec.elements_mut() {
            remap_attr(section, ID, ids)?;
        }
    }
    Ok(())
}

/// Remap a file group and everything inside it, returning `(old, new)` for
/// every identifier it defines
fn remap_file_group(
    group: &mut Element,
    names: &MetsNames,
    ids: &mut IdRemapper,
) -> Result<Vec<(String, String)>> {
    let mut defined = vec![remap_attr(group, ID, ids)?];
    remap_refs_attr(group, ADMID, ids)?;

    group.try_for_each_descendant_mut(&mut |element: &mut Element| {
        if element.is(&names.file) || element.is(&names.file_grp) {
            defined.push(remap_attr(element, ID, ids)?);
            remap_refs_attr(element, ADMID, ids)?;
            remap_refs_attr(element, DMDID, ids)?;
        }
        Ok(())
    })?;

    Ok(defined)
}

fn rewrite_file_section(
    root: &mut Element,
    names: &MetsNames,
    mode: ExclusionMode,
    ids: &mut IdRemapper,
    report: &mut TransformReport,
) -> Result<HashSet<String>> {
    let file_sec = root.required_child_mut(&names.file_sec)?;
    remap_attr(file_sec, ID, ids)?;

    let mut pruned = HashSet::new();
    for group in file_sec.children_named_mut(&names.file_grp) {
        let defined = remap_file_group(group, names, ids)?;
        let usage = group.required_attr(USE)?;
        if mode.is_excluded(usage) {
            debug!("Excluding fileGrp USE={} ({} ids)", usage, defined.len());
            for (old, new) in defined {
                pruned.insert(old);
                pruned.insert(new);
            }
        }
    }

    let removed = file_sec.remove_children_where(|group| {
        group.is(&names.file_grp) && group.attr(USE).is_some_and(|usage| mode.is_excluded(usage))
    });
    report
        .removed_file_groups
        .extend(removed.iter().filter_map(|group| group.attr(USE)).map(str::to_string));

    Ok(pruned)
}

fn rewrite_struct_maps(
    root: &mut Element,
    names: &MetsNames,
    mode: ExclusionMode,
    ids: &mut IdRemapper,
    pruned: &HashSet<String>,
    report: &mut TransformReport,
) -> Result<()> {
    let mut found = false;
    for struct_map in root.children_named_mut(&names.struct_map) {
        found = true;
        rewrite_struct_map(struct_map, names, mode, ids, pruned, report)?;
    }

    if !found {
        return Err(Error::malformed(format!(
            "<{}> has no <{}> child",
            root.name(),
            names.struct_map.raw()
        )));
    }
    Ok(())
}

fn rewrite_struct_map(
    struct_map: &mut Element,
    names: &MetsNames,
    mode: ExclusionMode,
    ids: &mut IdRemapper,
    pruned: &HashSet<String>,
    report: &mut TransformReport,
) -> Result<()> {
    remap_attr(struct_map, ID, ids)?;

    let root_div = struct_map.required_child_mut(&names.div)?;
    remap_attr(root_div, LABEL, ids)?;
    remap_attr(root_div, ID, ids)?;

    for div in root_div.children_named_mut(&names.div) {
        remap_attr(div, ID, ids)?;
        remap_refs_attr(div, DMDID, ids)?;
        remap_refs_attr(div, ADMID, ids)?;

        // Excluded divisions are dropped below, descendants untouched
        if mode.is_excluded(div.required_attr(LABEL)?) {
            continue;
        }

        div.try_for_each_descendant_mut(&mut |element: &mut Element| {
            if element.is(&names.div) {
                remap_attr(element, ID, ids)?;
                remap_refs_attr(element, DMDID, ids)?;
                remap_refs_attr(element, ADMID, ids)?;
            } else if element.is(&names.mptr) {
                if let Some(title) = &names.xlink_title {
                    remap_refs_attr(element, title, ids)?;
                }
            } else if element.is(&names.fptr) {
                remap_refs_attr(element, FILEID, ids)?;
            }
            Ok(())
        })?;
    }

    let removed = root_div.remove_children_where(|div| {
        div.is(&names.div) && div.attr(LABEL).is_some_and(|label| mode.is_excluded(label))
    });
    for div in &removed {
        debug!("Excluding div LABEL={}", div.attr(LABEL).unwrap_or_default());
    }
    report
        .removed_divisions
        .extend(removed.iter().filter_map(|div| div.attr(LABEL)).map(str::to_string));

    if !pruned.is_empty() {
        report.removed_pointers += drop_dangling_pointers(root_div, names, pruned);
    }
    Ok(())
}

fn is_dangling(element: &Element, names: &MetsNames, pruned: &HashSet<String>) -> bool {
    let target = if element.is(&names.fptr) {
        element.attr(FILEID)
    } else if element.is(&names.mptr) {
        names.xlink_title.as_deref().and_then(|title| element.attr(title))
    } else {
        None
    };
    target.is_some_and(|refs| refs.split_whitespace().any(|id| pruned.contains(id)))
}

/// Remove file/package pointers that reference a pruned identifier
fn drop_dangling_pointers(
    element: &mut Element,
    names: &MetsNames,
    pruned: &HashSet<String>,
) -> usize {
    let mut removed = element
        .remove_children_where(|child| is_dangling(child, names, pruned))
        .len();
    for child in element.elements_mut() {
        removed += drop_dangling_pointers(child, names, pruned);
    }
    removed
}
