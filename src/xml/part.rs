//! Loading and saving one XML part of an unpacked package.

use log::debug;
use std::fs;
use std::io::ErrorKind;

use crate::error::{Error, Result};
use crate::workspace::WorkingArea;

use super::tree::{Element, XmlDocument};

/// WordprocessingML main namespace
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Office document relationships namespace
pub const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Prefixes the document itself binds for the namespaces we touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    /// Prefix bound to [`WORDML_NS`]
    pub w: String,
    /// Prefix bound to [`RELATIONSHIPS_NS`], if declared
    pub r: Option<String>,
}

impl Namespaces {
    /// Resolve prefixes from the root element's declarations.
    ///
    /// The WordprocessingML namespace must have a prefix: its attributes are
    /// namespace-qualified, and no new declaration may be introduced. A
    /// descendant rebinding that prefix to another namespace is refused too.
    pub fn resolve(root: &Element) -> std::result::Result<Self, String> {
        let prefix_for = |uri: &str| {
            root.namespace_declarations()
                .find_map(|(prefix, bound)| (bound == uri).then_some(prefix).flatten())
                .map(str::to_string)
        };

        let w = prefix_for(WORDML_NS)
            .ok_or_else(|| format!("root <{}> binds no prefix to {WORDML_NS}", root.name))?;

        for el in root.descendants().into_iter().skip(1) {
            for (prefix, uri) in el.namespace_declarations() {
                if prefix == Some(w.as_str()) && uri != WORDML_NS {
                    return Err(format!("<{}> rebinds prefix {w} to {uri}", el.name));
                }
            }
        }

        Ok(Self {
            w,
            r: prefix_for(RELATIONSHIPS_NS),
        })
    }

    /// Qualified name in the WordprocessingML namespace
    pub fn w(&self, local: &str) -> String {
        format!("{}:{}", self.w, local)
    }
}

/// A parsed part together with its resolved prefixes
#[derive(Debug, Clone)]
pub struct XmlPart {
    pub document: XmlDocument,
    pub namespaces: Namespaces,
}

/// Parse `part` from the working area.
///
/// Returns `Ok(None)` when the package has no such part. Malformed XML is
/// [`Error::PartParse`].
pub fn load(area: &WorkingArea, part: &str) -> Result<Option<XmlPart>> {
    let path = area.part_path(part);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not present in package", part);
            return Ok(None);
        }
        Err(e) => return Err(Error::io(path, e)),
    };

    let document = XmlDocument::parse(&bytes).map_err(|e| Error::part_parse(part, format!("{e:#}")))?;
    let namespaces = Namespaces::resolve(&document.root).map_err(|e| Error::part_parse(part, e))?;
    debug!(
        "loaded {} ({} bytes, w prefix {:?}, r prefix {:?})",
        part,
        bytes.len(),
        namespaces.w,
        namespaces.r
    );

    Ok(Some(XmlPart {
        document,
        namespaces,
    }))
}

/// Serialize `document` over `part` in the working area
pub fn save(document: &XmlDocument, area: &WorkingArea, part: &str) -> Result<()> {
    let path = area.part_path(part);
    let bytes = document
        .to_bytes()
        .map_err(|e| Error::archive_write(&path, e))?;
    fs::write(&path, &bytes).map_err(|e| Error::archive_write(&path, e))?;
    debug!("saved {} ({} bytes)", part, bytes.len());
    Ok(())
}
