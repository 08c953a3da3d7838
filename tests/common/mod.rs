// tests/common/mod.rs

//! Shared fixtures for integration tests: small but realistic E-ARK AIPs.

#![allow(dead_code)]

use aip2dip::XmlDocument;
use aip2dip::mets::Element;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Package identifier of every fixture AIP
pub const AIP_ID: &str = "uuid-6b1d2c3e-0000-4000-8000-00000000a1b2";

/// Layout of a fixture AIP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AipShape {
    /// One representation, a `submission/` substructure and a top-level
    /// submission agreement file
    Submission,
    /// An access representation and its `-preservation` sibling; the access
    /// division also points at a preservation file
    Representation,
}

const SUBMISSION_METS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:csip="https://DILCIS.eu/XML/METS/CSIPExtensionMETS" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" OBJID="{AIP}" LABEL="Test AIP" TYPE="Mixed" PROFILE="https://earkaip.dilcis.eu/profile/E-ARK-AIP.xml" csip:CONTENTINFORMATIONTYPE="MIXED">
  <mets:metsHdr CREATEDATE="2024-05-01T10:00:00Z" RECORDSTATUS="NEW" csip:OAISPACKAGETYPE="AIP">
    <mets:agent ROLE="CREATOR" TYPE="OTHER" OTHERTYPE="SOFTWARE">
      <mets:name>Archive &amp; Co</mets:name>
    </mets:agent>
  </mets:metsHdr>
  <mets:dmdSec ID="uuid-dmd-0001">
    <mets:mdRef LOCTYPE="URL" MDTYPE="DC" xlink:type="simple" xlink:href="metadata/descriptive/dc.xml"/>
  </mets:dmdSec>
  <mets:amdSec>
    <mets:digiprovMD ID="uuid-prov-0001">
      <mets:mdRef LOCTYPE="URL" MDTYPE="PREMIS" xlink:type="simple" xlink:href="metadata/preservation/premis.xml"/>
    </mets:digiprovMD>
  </mets:amdSec>
  <mets:fileSec ID="uuid-filesec-0001">
    <mets:fileGrp ID="uuid-grp-sub" USE="Submission">
      <mets:file ID="uuid-file-sub1" MIMETYPE="application/xml">
        <mets:FLocat LOCTYPE="URL" xlink:type="simple" xlink:href="submission/METS.xml"/>
      </mets:file>
    </mets:fileGrp>
    <mets:fileGrp ID="uuid-grp-rep1" USE="Representations/rep1" ADMID="uuid-prov-0001">
      <mets:file ID="uuid-file-rep1" MIMETYPE="application/xml">
        <mets:FLocat LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1/METS.xml"/>
      </mets:file>
    </mets:fileGrp>
    <mets:fileGrp ID="uuid-grp-meta" USE="Descriptive">
      <mets:file ID="uuid-file-dc" MIMETYPE="application/xml">
        <mets:FLocat LOCTYPE="URL" xlink:type="simple" xlink:href="metadata/descriptive/dc.xml"/>
      </mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap ID="uuid-struct-0001" TYPE="PHYSICAL" LABEL="CSIP">
    <mets:div ID="uuid-div-root" LABEL="{AIP}">
      <mets:div ID="uuid-div-meta" LABEL="Metadata" DMDID="uuid-dmd-0001" ADMID="uuid-prov-0001">
        <mets:fptr FILEID="uuid-file-dc"/>
      </mets:div>
      <mets:div ID="uuid-div-sub" LABEL="submission">
        <mets:fptr FILEID="uuid-file-sub1"/>
      </mets:div>
      <mets:div ID="uuid-div-rep1" LABEL="Representations/rep1">
        <mets:mptr LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1/METS.xml" xlink:title="uuid-grp-rep1"/>
        <mets:fptr FILEID="uuid-file-rep1"/>
      </mets:div>
    </mets:div>
  </mets:structMap>
</mets:mets>
"#;

const REPRESENTATION_METS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" xmlns:csip="https://DILCIS.eu/XML/METS/CSIPExtensionMETS" xmlns:xlink="http://www.w3.org/1999/xlink" OBJID="{AIP}" TYPE="Mixed" PROFILE="https://earkaip.dilcis.eu/profile/E-ARK-AIP.xml">
  <!-- generated by fixture -->
  <metsHdr RECORDSTATUS="NEW" csip:OAISPACKAGETYPE="AIP"/>
  <dmdSec ID="dmd-1"/>
  <fileSec ID="filesec-1">
    <fileGrp ID="grp-rep1" USE="Representations/rep1">
      <file ID="file-rep1-pdf">
        <FLocat LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1/data/doc.pdf"/>
      </file>
    </fileGrp>
    <fileGrp ID="grp-rep1-pres" USE="Representations/rep1-preservation">
      <file ID="file-rep1-tif">
        <FLocat LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1-preservation/data/doc.tif"/>
      </file>
    </fileGrp>
  </fileSec>
  <structMap ID="struct-1" TYPE="PHYSICAL" LABEL="CSIP">
    <div ID="div-root" LABEL="{AIP}">
      <div ID="div-meta" LABEL="Metadata" DMDID="dmd-1"/>
      <div ID="div-rep1" LABEL="Representations/rep1">
        <mptr LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1/METS.xml" xlink:title="grp-rep1"/>
        <div ID="div-rep1-data" LABEL="data">
          <fptr FILEID="file-rep1-pdf"/>
          <fptr FILEID="file-rep1-tif"/>
        </div>
      </div>
      <div ID="div-rep1-pres" LABEL="Representations/rep1-preservation">
        <mptr LOCTYPE="URL" xlink:type="simple" xlink:href="representations/rep1-preservation/METS.xml" xlink:title="grp-rep1-pres"/>
        <fptr FILEID="file-rep1-tif"/>
      </div>
    </div>
  </structMap>
</mets>
"#;

/// Source METS text of a fixture shape
pub fn mets_text(shape: AipShape) -> String {
    let template = match shape {
        AipShape::Submission => SUBMISSION_METS,
        AipShape::Representation => REPRESENTATION_METS,
    };
    template.replace("{AIP}", AIP_ID)
}

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Create an AIP directory named [`AIP_ID`] under `parent`
pub fn create_aip(parent: &Path, shape: AipShape) -> PathBuf {
    create_aip_with_mets(parent, shape, &mets_text(shape))
}

/// Create a fixture AIP whose root METS is replaced by `mets`
pub fn create_aip_with_mets(parent: &Path, shape: AipShape, mets: &str) -> PathBuf {
    let aip = parent.join(AIP_ID);
    write(&aip, "METS.xml", mets.as_bytes());
    write(&aip, "metadata/descriptive/dc.xml", b"<dc><title>Test</title></dc>");
    write(&aip, "metadata/preservation/premis.xml", b"<premis/>");

    match shape {
        AipShape::Submission => {
            write(&aip, "representations/rep1/METS.xml", b"<mets/>");
            let pdf = [0x25, 0x50, 0x44, 0x46, 0x00, 0xff];
            write(&aip, "representations/rep1/data/report.pdf", &pdf);
            write(&aip, "submission/METS.xml", b"<sip/>");
            write(&aip, "submission/representations/rep1/data/report.pdf", b"original");
            write(&aip, "submission_agreement.pdf", b"agreement");
        }
        AipShape::Representation => {
            write(&aip, "representations/rep1/METS.xml", b"<mets/>");
            write(&aip, "representations/rep1/data/doc.pdf", b"pdf");
            write(&aip, "representations/rep1-preservation/METS.xml", b"<mets/>");
            write(&aip, "representations/rep1-preservation/data/doc.tif", b"tif");
        }
    }
    aip
}

/// Local part of an element or attribute name
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Every `ID` attribute value in the document
pub fn collect_ids(doc: &XmlDocument) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    doc.root().for_each_descendant(&mut |e: &Element| {
        if let Some(id) = e.attr("ID") {
            ids.insert(id.to_string());
        }
    });
    ids
}

/// Every identifier referenced by `FILEID`, `DMDID`, `ADMID` or `mptr/@xlink:title`
pub fn collect_refs(doc: &XmlDocument) -> Vec<String> {
    let mut refs = Vec::new();
    doc.root().for_each_descendant(&mut |e: &Element| {
        for attr in ["FILEID", "DMDID", "ADMID"] {
            if let Some(value) = e.attr(attr) {
                refs.extend(value.split_whitespace().map(str::to_string));
            }
        }
        if local_name(e.name()) == "mptr" {
            if let Some(title) = e.attr("xlink:title") {
                refs.push(title.to_string());
            }
        }
    });
    refs
}

/// Elements with the given local name, in document order
pub fn find_all<'a>(doc: &'a XmlDocument, local: &str) -> Vec<&'a Element> {
    fn walk<'a>(element: &'a Element, local: &str, out: &mut Vec<&'a Element>) {
        for child in element.elements() {
            if local_name(child.name()) == local {
                out.push(child);
            }
            walk(child, local, out);
        }
    }
    let mut out = Vec::new();
    walk(doc.root(), local, &mut out);
    out
}

/// Parse the METS document of a produced DIP
pub fn read_dip_mets(package_dir: &Path) -> XmlDocument {
    XmlDocument::read(&package_dir.join("METS.xml")).unwrap()
}
