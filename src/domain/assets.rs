//! Screenshot asset references and the cleanup policy.
//!
//! The media host addresses an uploaded image by its *public id*. A trade
//! may carry that id explicitly (`screenshot_id`) or only the delivery URL,
//! in which case the id is recovered from the URL path:
//!
//! ```text
//! <scheme>://<host>/.../upload/[v<digits>/]<public_id>.<ext>[?query][#fragment]
//! ```
//!
//! `<public_id>` may span several path segments (folders). The version
//! segment is skipped only when it is exactly `v` followed by digits.
//!
//! `plan_cleanup` decides which previous asset becomes orphaned by an
//! update. It is pure; scheduling the deletion is the janitor's job.

use once_cell::sync::Lazy;
use regex::Regex;

use super::trade::{Trade, TradePatch};

static UPLOAD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/upload/(?:v\d+/)?(?P<id>[^?#]+?)\.[A-Za-z0-9]+$")
        .expect("upload path pattern is valid")
});

/// Extract the media host public id from a delivery URL.
///
/// Returns `None` when the URL has no `/upload/` segment or no file
/// extension after the identifier.
pub fn extract_public_id(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];

    UPLOAD_PATH
        .captures(path)
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str())
        .filter(|id| !id.is_empty() && !id.ends_with('/'))
        .map(str::to_string)
}

/// The asset reference currently held by a stored trade.
///
/// Prefers the explicit `screenshot_id`, falling back to the URL.
pub fn reference_of(trade: &Trade) -> Option<String> {
    trade
        .screenshot_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| trade.screenshot_url.as_deref().and_then(extract_public_id))
}

/// What an update says about the trade's screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingReference {
    /// No screenshot field supplied.
    Untouched,
    /// The screenshot was removed, or swapped for a URL with no public id.
    Cleared,
    /// The screenshot now points at this public id.
    Replaced(String),
}

/// Classify the screenshot part of a patch.
///
/// Mirrors `TradePatch::apply`: a new URL without an explicit id leaves the
/// record holding whatever id the URL yields, which may be none at all.
pub fn incoming_reference(patch: &TradePatch) -> IncomingReference {
    if let Some(Some(id)) = &patch.screenshot_id {
        if !id.is_empty() {
            return IncomingReference::Replaced(id.clone());
        }
    }

    match (&patch.screenshot_url, &patch.screenshot_id) {
        (Some(Some(url)), _) => extract_public_id(url)
            .map_or(IncomingReference::Cleared, IncomingReference::Replaced),
        (Some(None), None | Some(None)) => IncomingReference::Cleared,
        _ => IncomingReference::Untouched,
    }
}

/// Decide which previous asset, if any, an update orphans.
///
/// - replaced by a different id: the old asset is deleted
/// - explicitly cleared: the old asset is deleted
/// - untouched, or replaced by the same id: nothing to do
pub fn plan_cleanup(old: Option<&str>, incoming: &IncomingReference) -> Option<String> {
    let old = old.filter(|id| !id.is_empty())?;
    match incoming {
        IncomingReference::Replaced(new) if new != old => Some(old.to_string()),
        IncomingReference::Cleared => Some(old.to_string()),
        _ => None,
    }
}
