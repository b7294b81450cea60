use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One row of the provider's major list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorEntry {
    pub name: String,
    #[serde(alias = "uid")]
    pub identifier: i64,
}

impl MajorEntry {
    pub fn new(name: impl Into<String>, identifier: i64) -> Self {
        Self {
            name: name.into(),
            identifier,
        }
    }
}

/// A logical major: a display name and every identifier that shares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MajorIdentity {
    pub name: String,
    pub identifiers: Vec<i64>,
}

/// Majors keyed by exact (case-sensitive) name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct MajorIndex {
    majors: Vec<MajorIdentity>,
    positions: HashMap<String, usize>,
}

impl MajorIndex {
    /// Groups identifiers under their name. Repeated `(name, identifier)`
    /// pairs collapse into one.
    pub fn build(entries: &[MajorEntry]) -> Self {
        let mut index = MajorIndex::default();
        let mut owners: HashMap<i64, &str> = HashMap::new();

        for entry in entries {
            if let Some(owner) = owners.get(&entry.identifier) {
                if *owner != entry.name {
                    warn!(
                        identifier = entry.identifier,
                        first = %owner,
                        second = %entry.name,
                        "Identifier listed under two major names"
                    );
                }
            } else {
                owners.insert(entry.identifier, &entry.name);
            }

            let pos = match index.positions.get(&entry.name) {
                Some(&pos) => pos,
                None => {
                    index.majors.push(MajorIdentity {
                        name: entry.name.clone(),
                        identifiers: Vec::new(),
                    });
                    index.positions.insert(entry.name.clone(), index.majors.len() - 1);
                    index.majors.len() - 1
                }
            };

            let ids = &mut index.majors[pos].identifiers;
            if !ids.contains(&entry.identifier) {
                ids.push(entry.identifier);
            }
        }

        index
    }

    pub fn get(&self, name: &str) -> Option<&MajorIdentity> {
        self.positions.get(name).map(|&pos| &self.majors[pos])
    }

    pub fn identifiers(&self, name: &str) -> Option<&[i64]> {
        self.get(name).map(|m| m.identifiers.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MajorIdentity> {
        self.majors.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.majors.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.majors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.majors.is_empty()
    }
}
