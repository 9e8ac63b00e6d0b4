//! Selection of the resource sets that take part in a run.

use std::borrow::Cow;

use crate::ResourceSet;

/// Applies the limits of explicitly included or excluded resource sets,
/// preserving the declared order.
///
/// Terms match a resource set by its name or by the name of the collection it
/// belongs to. Exclusion is applied first, so a resource set that is both
/// included and excluded is excluded. Without any limits the input is
/// returned as-is.
pub fn apply_limits<'a, S: AsRef<str>>(
    resource_sets: &'a [ResourceSet],
    include: &[S],
    exclude: &[S],
) -> Cow<'a, [ResourceSet]> {
    if include.is_empty() && exclude.is_empty() {
        return Cow::Borrowed(resource_sets);
    }

    let limited = resource_sets
        .iter()
        .filter(|rs| !matches_any(exclude, rs))
        .filter(|rs| include.is_empty() || matches_any(include, rs))
        .cloned()
        .collect::<Vec<_>>();
    Cow::Owned(limited)
}

fn matches_any<S: AsRef<str>>(terms: &[S], rs: &ResourceSet) -> bool {
    terms.iter().any(|term| rs.matches(term.as_ref()))
}
