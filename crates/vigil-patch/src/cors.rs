//! Cross-origin attribute normalization
//!
//! External scripts loaded without `crossorigin` report their errors as the
//! opaque `"Script error."`. The normalizer swaps each such tag for a copy
//! carrying `crossorigin="anonymous"`. The swap is a single
//! [`Document::replace_with`], so there is never a moment where both tags, or
//! neither, are in the document.

use crate::error::PatchError;
use serde::{Deserialize, Serialize};
use url::Url;
use vigil_dom::{Document, NodeId};

/// Value written to the `crossorigin` attribute
pub const CROSSORIGIN_VALUE: &str = "anonymous";

/// A tag that was replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchedTag {
    /// `script` or `link`
    pub tag: String,
    /// The `src` or `href`
    pub url: String,
    /// Replacement element
    #[serde(skip)]
    pub node: Option<NodeId>,
}

/// Result of a normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsReport {
    /// Tags replaced, in document order
    pub patched: Vec<PatchedTag>,
}

impl CorsReport {
    /// Whether nothing changed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patched.is_empty()
    }

    /// Patched URLs
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.patched.iter().map(|p| p.url.as_str())
    }
}

/// Adds `crossorigin` to external script and stylesheet tags
#[derive(Debug, Clone, Default)]
pub struct CorsNormalizer {
    origin: Option<Url>,
}

impl CorsNormalizer {
    /// Create normalizer that treats every absolute http(s) URL as external
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page origin; URLs on this origin are left alone
    ///
    /// # Errors
    /// Returns `PatchError::InvalidOrigin` if `origin` does not parse.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, PatchError> {
        let url = Url::parse(origin).map_err(|e| PatchError::InvalidOrigin {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        self.origin = Some(url);
        Ok(self)
    }

    /// Whether `url` points off the page origin
    ///
    /// Relative URLs are same-origin by definition.
    #[must_use]
    pub fn is_external(&self, url: &str) -> bool {
        let absolute = if url.starts_with("//") {
            format!("https:{url}")
        } else {
            url.to_string()
        };
        let Ok(parsed) = Url::parse(&absolute) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        match &self.origin {
            Some(origin) => parsed.origin() != origin.origin(),
            None => true,
        }
    }

    /// Tags that would be replaced with their URL, in document order
    #[must_use]
    pub fn candidates(&self, doc: &Document) -> Vec<(NodeId, String)> {
        doc.descendants(doc.root())
            .into_iter()
            .filter_map(|id| resource_url(doc, id).map(|url| (id, url.to_string())))
            .filter(|(id, url)| !doc.has_attribute(*id, "crossorigin") && self.is_external(url))
            .collect()
    }

    /// Replace every candidate tag with a `crossorigin="anonymous"` copy
    ///
    /// # Errors
    /// Returns `PatchError::Dom` if a replacement cannot be inserted; tags
    /// patched before the failure stay patched.
    pub fn normalize(&self, doc: &mut Document) -> Result<CorsReport, PatchError> {
        let mut report = CorsReport::default();
        for (old, url) in self.candidates(doc) {
            let replacement = replace_with_crossorigin(doc, old)?;
            let tag = doc.tag_name(replacement).unwrap_or_default().to_string();
            tracing::info!(tag = %tag, url = %url, "added crossorigin attribute");
            report.patched.push(PatchedTag {
                tag,
                url,
                node: Some(replacement),
            });
        }
        Ok(report)
    }
}

/// `src` of a script or `href` of a stylesheet link
fn resource_url(doc: &Document, id: NodeId) -> Option<&str> {
    match doc.tag_name(id)? {
        "script" => doc.attribute(id, "src"),
        "link" => {
            let rel = doc.attribute(id, "rel")?;
            if rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")) {
                doc.attribute(id, "href")
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Build a copy of `old` with `crossorigin` set and swap it in
fn replace_with_crossorigin(doc: &mut Document, old: NodeId) -> Result<NodeId, PatchError> {
    let element = doc.element(old).ok_or(vigil_dom::DomError::NotAnElement(old))?;
    let tag = element.tag().to_string();
    let attributes: Vec<(String, String)> = element
        .attributes()
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("crossorigin"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let children = doc.children(old).to_vec();

    let new = doc.create_element(&tag);
    for (name, value) in attributes {
        doc.set_attribute(new, &name, value)?;
    }
    doc.set_attribute(new, "crossorigin", CROSSORIGIN_VALUE)?;
    for child in children {
        doc.append_child(new, child)?;
    }
    doc.replace_with(old, new)?;
    Ok(new)
}
