use super::MajorIndex;

/// Case-insensitive substring search over major names.
///
/// Names are case-folded once at build time so each query costs one pass
/// over the majors.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<(String, String)>,
}

impl SearchIndex {
    pub fn new(index: &MajorIndex) -> Self {
        Self {
            entries: index
                .names()
                .map(|name| (name.to_lowercase(), name.to_string()))
                .collect(),
        }
    }

    /// Every name containing `query`, in index order. An empty query matches
    /// everything.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|(folded, _)| folded.contains(&needle))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
