//! Script path casing
//!
//! Rewrites `<script src>` whose file stem matches a known module name in a
//! different case, e.g. `js/orgchart.js` to `js/orgChart.js`. Servers on
//! case-sensitive filesystems otherwise answer 404.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use vigil_dom::{Document, NodeId};

use crate::error::PatchError;

static SCRIPT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<dir>(?:.*/)?)(?P<stem>[A-Za-z0-9_-]+)(?P<ext>\.m?js)(?P<rest>[?#].*)?$")
        .expect("valid regex")
});

/// One rewritten `src`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    /// Original value
    pub from: String,
    /// New value
    pub to: String,
}

/// Rewrites script paths to canonical module casing
#[derive(Debug, Clone, Default)]
pub struct ScriptPathNormalizer {
    known: Vec<String>,
}

impl ScriptPathNormalizer {
    /// Create normalizer for the given module names
    #[must_use]
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
        }
    }

    /// Canonical form of `src`, or `None` when it is already canonical or unknown
    #[must_use]
    pub fn canonical(&self, src: &str) -> Option<String> {
        let caps = SCRIPT_PATH.captures(src)?;
        let stem = caps.name("stem")?.as_str();
        let canonical = self
            .known
            .iter()
            .find(|k| k.as_str() != stem && k.eq_ignore_ascii_case(stem))?;
        Some(format!(
            "{}{}{}{}",
            caps.name("dir").map_or("", |m| m.as_str()),
            canonical,
            caps.name("ext").map_or("", |m| m.as_str()),
            caps.name("rest").map_or("", |m| m.as_str()),
        ))
    }

    /// Rewrite every mis-cased script `src` in the document
    ///
    /// # Errors
    /// Returns `PatchError::Dom` if an attribute cannot be written.
    pub fn normalize(&self, doc: &mut Document) -> Result<Vec<PathRewrite>, PatchError> {
        let targets: Vec<(NodeId, String, String)> = doc
            .elements_by_tag("script")
            .into_iter()
            .filter_map(|id| {
                let src = doc.attribute(id, "src")?;
                self.canonical(src).map(|to| (id, src.to_string(), to))
            })
            .collect();

        let mut rewrites = Vec::with_capacity(targets.len());
        for (id, from, to) in targets {
            doc.set_attribute(id, "src", to.clone())?;
            tracing::info!(from = %from, to = %to, "script path case corrected");
            rewrites.push(PathRewrite { from, to });
        }
        Ok(rewrites)
    }
}
