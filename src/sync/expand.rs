//! Candidate expansion
//!
//! Turns an ordered selector list into the ordered, deduplicated list of
//! package names a sync run visits.

use std::collections::HashSet;

use tracing::debug;

use crate::Result;
use crate::provider::ModuleLoader;
use crate::selector::{ExclusionSet, Selector};

/// Expand `selectors` into candidate package names.
///
/// Order follows the selectors, then each selector's own discovery order.
/// Excluded names are dropped before anything is loaded. Every name reached
/// through a loading selector is loaded once, even when an earlier `+`
/// selector already placed it; a load failure aborts the expansion.
pub fn expand(
    selectors: &[Selector],
    exclusions: &ExclusionSet,
    loader: &dyn ModuleLoader,
) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut loaded = HashSet::new();
    let mut candidates = Vec::new();

    for selector in selectors {
        let names = match selector {
            Selector::LoadedPrefix(prefix) => loader.loaded_under(prefix),
            Selector::ModulePrefix(prefix) => loader.modules_under(prefix)?,
            Selector::Loaded(name) | Selector::Module(name) => vec![name.clone()],
        };
        debug!(%selector, matched = names.len(), "selector expanded");

        for name in names {
            if exclusions.is_excluded(&name) {
                debug!(name = %name, "excluded by rule");
                continue;
            }
            if selector.requires_load() && loaded.insert(name.clone()) {
                loader.load(&name)?;
            }
            if seen.insert(name.clone()) {
                candidates.push(name);
            }
        }
    }

    Ok(candidates)
}
