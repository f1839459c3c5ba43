//! Cross-reference duplicate warnings.
//!
//! A name is flagged when the same physical item is also referenced from
//! another kit, another machine's accessories, or the loose entries of the
//! zone. The index is rebuilt from the aggregation on every query.

use super::{GroupKey, ZoneAggregation};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// Other place a name also appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningPart {
    Kit,
    Accessori,
    Sfusi,
}

impl Display for WarningPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kit => write!(f, "KIT"),
            Self::Accessori => write!(f, "ACCESSORI"),
            Self::Sfusi => write!(f, "SFUSI"),
        }
    }
}

/// Non-empty list of places, rendered as `ALTRI IN <A> E <B>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRefWarning {
    pub parts: Vec<WarningPart>,
}

impl CrossRefWarning {
    fn from_parts(parts: Vec<WarningPart>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(Self { parts })
        }
    }
}

impl Display for CrossRefWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ALTRI IN ")?;
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                write!(f, " E ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Name -> containing complex keys, plus the set of simple names.
#[derive(Debug, Clone, Default)]
pub struct CrossRefIndex {
    containers: HashMap<String, BTreeSet<GroupKey>>,
    simple: HashSet<String>,
}

impl CrossRefIndex {
    pub fn build(aggregation: &ZoneAggregation) -> Self {
        let mut containers: HashMap<String, BTreeSet<GroupKey>> = HashMap::new();
        for entry in aggregation.complex.values() {
            for name in entry.children.keys() {
                containers
                    .entry(name.clone())
                    .or_default()
                    .insert(entry.key.clone());
            }
        }
        Self {
            containers,
            simple: aggregation.simple.keys().cloned().collect(),
        }
    }

    /// Warning for child `name` listed under `containing`.
    pub fn child_warning(&self, name: &str, containing: &GroupKey) -> Option<CrossRefWarning> {
        let mut parts = Vec::new();
        if let Some(keys) = self.containers.get(name) {
            let others: Vec<&GroupKey> = keys.iter().filter(|key| *key != containing).collect();
            if others.iter().any(|key| key.is_kit()) {
                parts.push(WarningPart::Kit);
            }
            if others.iter().any(|key| !key.is_kit()) {
                parts.push(WarningPart::Accessori);
            }
        }
        if self.simple.contains(name) {
            parts.push(WarningPart::Sfusi);
        }
        CrossRefWarning::from_parts(parts)
    }

    /// Warning for a complex entry's own name against the loose entries.
    pub fn top_level_warning(&self, name: &str) -> Option<CrossRefWarning> {
        if self.simple.contains(name) {
            CrossRefWarning::from_parts(vec![WarningPart::Sfusi])
        } else {
            None
        }
    }
}
