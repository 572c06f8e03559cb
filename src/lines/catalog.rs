//! Line catalog

use super::{LineEntry, LineKey};
use crate::floor::{Stat, Subject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// All lines available for a scan, across events and bookmakers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineCatalog {
    entries: Vec<LineEntry>,
}

impl LineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LineEntry) {
        self.entries.push(entry);
    }

    /// Append every line from another catalog
    pub fn merge(&mut self, other: LineCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct subjects with at least one line
    pub fn subjects(&self) -> BTreeSet<&Subject> {
        self.entries.iter().map(|e| &e.subject).collect()
    }

    /// Lines for one subject and statistic, both sides
    pub fn lines_for<'a>(
        &'a self,
        subject: &'a Subject,
        stat: Stat,
    ) -> impl Iterator<Item = &'a LineEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| &e.subject == subject && e.stat == stat)
    }

    /// Complete line sets keyed by subject, statistic and side.
    ///
    /// Every line of a key is collected before the map is returned, so a
    /// consumer never sees a partial set for a subject.
    pub fn grouped(&self) -> BTreeMap<LineKey, Vec<LineEntry>> {
        let mut groups: BTreeMap<LineKey, Vec<LineEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(LineKey::from(entry)).or_default().push(entry.clone());
        }
        groups
    }
}

impl FromIterator<LineEntry> for LineCatalog {
    fn from_iter<I: IntoIterator<Item = LineEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
