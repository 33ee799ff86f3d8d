use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, btree_map},
    fmt,
};

/// Well-known selector names. Every factory understands `id` and
/// `version`; `name` and `guid` are enabled per factory.
pub const ID_SELECTOR: &str = "id";
pub const NAME_SELECTOR: &str = "name";
pub const VERSION_SELECTOR: &str = "version";
pub const GUID_SELECTOR: &str = "guid";

///
/// SelectorMap
///
/// Named key/value constraints addressing zero-or-one entity. Selectors
/// are conjunctive: every entry present must match the resolved entity.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SelectorMap(BTreeMap<String, String>);

impl SelectorMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The selector map returned from create: identity only.
    #[must_use]
    pub fn single_id(id: impl ToString) -> Self {
        let mut map = Self::new();
        map.insert(ID_SELECTOR, id.to_string());
        map
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get(ID_SELECTOR)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_SELECTOR)
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.get(VERSION_SELECTOR)
    }

    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.get(GUID_SELECTOR)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for SelectorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, (key, value)) in self.0.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a SelectorMap {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SelectorMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Assemble the advertised selector-name set for a factory.
#[must_use]
pub fn selector_names(
    allow_name: bool,
    allow_guid: bool,
    custom: &[&'static str],
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    names.insert(ID_SELECTOR.to_owned());
    names.insert(VERSION_SELECTOR.to_owned());
    if allow_name {
        names.insert(NAME_SELECTOR.to_owned());
    }
    if allow_guid {
        names.insert(GUID_SELECTOR.to_owned());
    }
    names.extend(custom.iter().map(|s| (*s).to_owned()));
    names
}
