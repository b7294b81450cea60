//! Major name → identifier index and the name search built on top of it.

mod index;
mod search;

pub use index::{MajorEntry, MajorIdentity, MajorIndex};
pub use search::SearchIndex;
