//! First-set-wins merging shared by the config resolver and every manifest
//! generator.
//!
//! All helpers take their candidates highest precedence first. A candidate
//! counts as set when it is `Some` and its value is not the zero value for
//! its type (empty string, `0`, empty collection).

use std::collections::BTreeMap;

/// Zero-value detection for merge candidates.
pub trait Unset {
    fn is_unset(&self) -> bool;
}

impl Unset for str {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Unset for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Unset for u32 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

impl Unset for i32 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

impl Unset for u16 {
    fn is_unset(&self) -> bool {
        *self == 0
    }
}

// An explicit `Some(false)` is a decision, not an absence.
impl Unset for bool {
    fn is_unset(&self) -> bool {
        false
    }
}

impl<T> Unset for Vec<T> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Unset for BTreeMap<K, V> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Unset + ?Sized> Unset for &T {
    fn is_unset(&self) -> bool {
        (**self).is_unset()
    }
}

/// Return the first candidate that is set.
pub fn first_set<T: Unset>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().find(|v| !v.is_unset())
}

/// Walk `layers` and return a clone of the first set value produced by `get`.
pub fn layered<'a, L: 'a, T>(layers: &[&'a L], get: impl Fn(&'a L) -> Option<&'a T>) -> Option<T>
where
    T: Unset + Clone + 'a,
{
    first_set(layers.iter().map(|l| get(*l))).cloned()
}

/// Additive map merge: every key from every source survives, and on a key
/// collision the higher-precedence source wins.
pub fn merge_maps<'a, V: Clone + 'a>(
    highest_first: impl IntoIterator<Item = Option<&'a BTreeMap<String, V>>>,
) -> BTreeMap<String, V> {
    let sources: Vec<_> = highest_first.into_iter().flatten().collect();
    let mut out = BTreeMap::new();
    for map in sources.into_iter().rev() {
        for (k, v) in map {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

/// [`merge_maps`] over config layers.
pub fn layered_map<'a, L: 'a, V: Clone + 'a>(
    layers: &[&'a L],
    get: impl Fn(&'a L) -> Option<&'a BTreeMap<String, V>>,
) -> BTreeMap<String, V> {
    merge_maps(layers.iter().map(|l| get(*l)))
}
