//! Merging of variable layers.

use std::borrow::Cow;

use crate::Bindings;

/// Merges two sets of bindings, with values from `overrides` taking precedence
/// over values from `base`.
///
/// If either side is empty, the other side is returned as-is: a borrowed
/// input comes back borrowed and nothing is copied. Otherwise a new mapping
/// is produced. Nested values are replaced wholesale, never merged.
pub fn merge<'a>(base: Cow<'a, Bindings>, overrides: Cow<'a, Bindings>) -> Cow<'a, Bindings> {
    if overrides.is_empty() {
        return base;
    }
    if base.is_empty() {
        return overrides;
    }

    let mut merged = base.into_owned();
    match overrides {
        Cow::Borrowed(o) => merged.extend(o.iter().map(|(k, v)| (k.clone(), v.clone()))),
        Cow::Owned(o) => merged.extend(o),
    }
    Cow::Owned(merged)
}

/// Merges all of the given layers in order, lowest precedence first.
pub fn merge_all<'a, I>(layers: I) -> Cow<'a, Bindings>
where
    I: IntoIterator<Item = Cow<'a, Bindings>>,
{
    layers
        .into_iter()
        .fold(Cow::Owned(Bindings::new()), merge)
}
