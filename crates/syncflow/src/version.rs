//! Index version naming
//!
//! Physical indices are named `{base}` or `{base}_v{N}`; the version number
//! strictly increases across rebuilds so a new index never collides with the
//! one still serving readers.

use crate::error::{Error, Result};

/// The next version name after `current`.
///
/// A name carrying a `_v{N}` suffix increments to `_v{N+1}`; any other name
/// (including a bare base, or a malformed suffix) gets `_v1` appended. This
/// keeps names monotonically increasing even if the base shape changes over
/// time.
#[must_use]
pub fn next_version(current: &str) -> String {
    if let Some((base, suffix)) = current.rsplit_once("_v") {
        if let Ok(n) = suffix.parse::<u64>() {
            return format!("{base}_v{}", n + 1);
        }
    }
    format!("{current}_v1")
}

/// Resolve the currently live version of `base` from the index catalog.
///
/// Exactly one catalog entry containing `base` is the live version; none
/// means no prior version exists (first rebuild). More than one match is an
/// ambiguous state a rebuild cannot safely interpret and is an error
/// requiring operator intervention, never a positional guess.
pub fn resolve_current(catalog: &[String], base: &str) -> Result<Option<String>> {
    let mut candidates: Vec<String> = catalog
        .iter()
        .filter(|name| name.contains(base))
        .cloned()
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => Err(Error::AmbiguousIndex {
            base: base.to_string(),
            candidates,
        }),
    }
}
