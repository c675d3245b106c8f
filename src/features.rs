//! ## Feature name sets
//!
//! Transformers accept either a single column name or a list of names. [`FeatureNames`]
//! normalises both forms into an ordered list without duplicates, so the ambiguous form
//! never reaches a transformer's state.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Deref;

/// Ordered, de-duplicated set of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureNames(Vec<String>);

impl FeatureNames {
    /// Builds a name set from any iterator of names, keeping the first occurrence of each.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self(unique)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for FeatureNames {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for FeatureNames {
    fn from(name: &str) -> Self {
        Self::new([name])
    }
}

impl From<String> for FeatureNames {
    fn from(name: String) -> Self {
        Self::new([name])
    }
}

impl From<Vec<String>> for FeatureNames {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<Vec<&str>> for FeatureNames {
    fn from(names: Vec<&str>) -> Self {
        Self::new(names)
    }
}

impl From<&[&str]> for FeatureNames {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FeatureNames {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}

impl<'a> IntoIterator for &'a FeatureNames {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A name set is written as a list; a bare string is read as a one-element list.
impl Serialize for FeatureNames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FeatureNames {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(name) => FeatureNames::from(name),
            OneOrMany::Many(names) => FeatureNames::from(names),
        })
    }
}
