//! Label mapping
//!
//! Converts a case's tags and severity into Gitea label ids. Pure: the
//! result depends only on the arguments, so it is computed fresh every cycle
//! from the organization's current label set.

use crate::model::{Label, Severity};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Severity name -> label id, with "low" as the fallback entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityTable {
    entries: HashMap<String, u64>,
}

impl SeverityTable {
    pub fn new(entries: &BTreeMap<String, u64>) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(name, id)| (name.trim().to_lowercase(), *id))
                .collect(),
        }
    }

    /// Label id for `severity`, falling back to the "low" entry
    pub fn resolve(&self, severity: Severity) -> Option<u64> {
        self.entries
            .get(severity.as_str())
            .or_else(|| self.entries.get(Severity::Low.as_str()))
            .copied()
    }
}

impl From<&BTreeMap<String, u64>> for SeverityTable {
    fn from(entries: &BTreeMap<String, u64>) -> Self {
        Self::new(entries)
    }
}

/// Label ids for a case.
///
/// Tags matching an organization label name (ignoring case) contribute that
/// label's id; other tags are dropped. The severity contributes its table entry.
pub fn map_labels(
    tags: &[String],
    severity: Severity,
    org_labels: &[Label],
    severities: &SeverityTable,
) -> BTreeSet<u64> {
    let by_name: HashMap<String, u64> = org_labels
        .iter()
        .map(|label| (label.name.to_lowercase(), label.id))
        .collect();

    let mut ids: BTreeSet<u64> = tags
        .iter()
        .filter_map(|tag| by_name.get(&tag.to_lowercase()).copied())
        .collect();

    if let Some(id) = severities.resolve(severity) {
        ids.insert(id);
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u64)]) -> SeverityTable {
        let map: BTreeMap<String, u64> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        SeverityTable::new(&map)
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tags_and_severity_resolve_to_ids() {
        let labels = vec![Label::new(1, "network"), Label::new(2, "critical")];
        let severities = table(&[("low", 10), ("critical", 2)]);

        let ids = map_labels(
            &tags(&["network", "unmatched"]),
            Severity::Critical,
            &labels,
            &severities,
        );

        assert_eq!(ids, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_tag_match_ignores_case() {
        let labels = vec![Label::new(5, "Phishing")];
        let ids = map_labels(&tags(&["PHISHING"]), Severity::Low, &labels, &table(&[("low", 10)]));
        assert_eq!(ids, BTreeSet::from([5, 10]));
    }

    #[test]
    fn test_missing_severity_falls_back_to_low() {
        let severities = table(&[("low", 10), ("critical", 2)]);
        let ids = map_labels(&[], Severity::High, &[], &severities);
        assert_eq!(ids, BTreeSet::from([10]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let labels = vec![Label::new(3, "malware")];
        let severities = table(&[("low", 3)]);
        let ids = map_labels(
            &tags(&["malware", "Malware"]),
            Severity::Low,
            &labels,
            &severities,
        );
        assert_eq!(ids, BTreeSet::from([3]));
    }

    #[test]
    fn test_no_labels_available() {
        let ids = map_labels(&tags(&["network"]), Severity::Medium, &[], &table(&[("low", 10)]));
        assert_eq!(ids, BTreeSet::from([10]));
    }

    #[test]
    fn test_empty_table_contributes_nothing() {
        let labels = vec![Label::new(1, "network")];
        let ids = map_labels(&tags(&["network"]), Severity::Critical, &labels, &table(&[]));
        assert_eq!(ids, BTreeSet::from([1]));
    }

    #[test]
    fn test_table_keys_normalized() {
        let severities = table(&[("LOW", 10), (" Critical ", 2)]);
        assert_eq!(severities.resolve(Severity::Critical), Some(2));
        assert_eq!(severities.resolve(Severity::Medium), Some(10));
    }
}
