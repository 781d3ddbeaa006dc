use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One `(subject, predicate, object)` statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RdfTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Deduplicated `(predicate, object)` pairs about one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleSet(BTreeSet<(String, String)>);

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the pair was already present.
    pub fn insert(&mut self, predicate: impl Into<String>, object: impl Into<String>) -> bool {
        self.0.insert((predicate.into(), object.into()))
    }

    pub fn union(&mut self, other: TripleSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, predicate: &str, object: &str) -> bool {
        self.0.contains(&(predicate.to_string(), object.to_string()))
    }

    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.0.iter().any(|(p, _)| p == predicate)
    }

    /// Objects paired with `predicate`.
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(p, _)| p == predicate)
            .map(|(_, o)| o.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, o)| (p.as_str(), o.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for TripleSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Subject to triple set. Merging is always a union.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGraph(BTreeMap<String, TripleSet>);

impl SubjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, subject: impl Into<String>, triples: TripleSet) {
        self.0.entry(subject.into()).or_default().union(triples);
    }

    pub fn get(&self, subject: &str) -> Option<&TripleSet> {
        self.0.get(subject)
    }

    pub fn contains_subject(&self, subject: &str) -> bool {
        self.0.contains_key(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TripleSet)> {
        self.0.iter().map(|(s, t)| (s.as_str(), t))
    }

    pub fn triples(&self) -> impl Iterator<Item = RdfTriple> + '_ {
        self.0.iter().flat_map(|(subject, set)| {
            set.iter().map(move |(predicate, object)| RdfTriple {
                subject: subject.clone(),
                predicate: predicate.to_string(),
                object: object.to_string(),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for SubjectGraph {
    type Item = (String, TripleSet);
    type IntoIter = std::collections::btree_map::IntoIter<String, TripleSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SubjectEntry {
    triples: TripleSet,
    sourced: bool,
}

/// All extracted subjects, each carrying a sourced flag that is set once and never cleared.
///
/// A subject is sourced as soon as any contribution to it carries the source predicate; the
/// sourced and unsourced views are disjoint and together hold every subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    source_predicate: String,
    subjects: BTreeMap<String, SubjectEntry>,
}

impl Partition {
    pub fn new(source_predicate: impl Into<String>) -> Self {
        Self {
            source_predicate: source_predicate.into(),
            subjects: BTreeMap::new(),
        }
    }

    /// Union `triples` into `subject`, marking it sourced if this contribution cites a source.
    pub fn merge(&mut self, subject: impl Into<String>, triples: TripleSet) {
        let cites_source = triples.has_predicate(&self.source_predicate);
        let entry = self.subjects.entry(subject.into()).or_default();
        entry.sourced |= cites_source;
        entry.triples.union(triples);
    }

    pub fn merge_graph(&mut self, graph: SubjectGraph) {
        for (subject, triples) in graph {
            self.merge(subject, triples);
        }
    }

    pub fn is_sourced(&self, subject: &str) -> bool {
        self.subjects.get(subject).map(|e| e.sourced).unwrap_or(false)
    }

    pub fn get(&self, subject: &str) -> Option<&TripleSet> {
        self.subjects.get(subject).map(|e| &e.triples)
    }

    pub fn sourced(&self) -> SubjectGraph {
        self.view(true)
    }

    pub fn unsourced(&self) -> SubjectGraph {
        self.view(false)
    }

    fn view(&self, sourced: bool) -> SubjectGraph {
        SubjectGraph(
            self.subjects
                .iter()
                .filter(|(_, entry)| entry.sourced == sourced)
                .map(|(subject, entry)| (subject.clone(), entry.triples.clone()))
                .collect(),
        )
    }

    /// Split into `(sourced, unsourced)`.
    pub fn into_graphs(self) -> (SubjectGraph, SubjectGraph) {
        let mut sourced = SubjectGraph::new();
        let mut unsourced = SubjectGraph::new();
        for (subject, entry) in self.subjects {
            if entry.sourced {
                sourced.0.insert(subject, entry.triples);
            } else {
                unsourced.0.insert(subject, entry.triples);
            }
        }
        (sourced, unsourced)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn statistics(&self) -> PartitionStats {
        let mut stats = PartitionStats::default();
        let mut predicates = BTreeSet::new();

        for entry in self.subjects.values() {
            if entry.sourced {
                stats.sourced_subjects += 1;
            } else {
                stats.unsourced_subjects += 1;
            }
            stats.total_triples += entry.triples.len();
            predicates.extend(entry.triples.iter().map(|(p, _)| p.to_string()));
        }

        stats.unique_predicates = predicates.len();
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub total_triples: usize,
    pub sourced_subjects: usize,
    pub unsourced_subjects: usize,
    pub unique_predicates: usize,
}

impl fmt::Display for PartitionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "Extraction Statistics:\n\
             Total Triples: {}\n\
             Sourced Subjects: {}\n\
             Unsourced Subjects: {}\n\
             Unique Predicates: {}",
            self.total_triples,
            self.sourced_subjects,
            self.unsourced_subjects,
            self.unique_predicates
        )
    }
}
