//! OSM entity model consumed by the condition engine.
//!
//! Conditions only see entities through the [`Primitive`] trait. The concrete
//! [`Node`], [`Way`] and [`Relation`] types below back the CLI and the tests;
//! they deserialize from a JSON data set of the form
//! `{"nodes": [...], "ways": [...], "relations": [...]}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Ordered tag mapping.
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed reference to an element, as used in relation member lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct MemberRef {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(rename = "ref")]
    pub id: i64,
}

/// One entry of a relation's ordered member list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Member {
    #[serde(flatten)]
    pub member: MemberRef,
    #[serde(default)]
    pub role: String,
}

impl Member {
    pub fn new(kind: ElementKind, id: i64, role: impl Into<String>) -> Self {
        Self {
            member: MemberRef { kind, id },
            role: role.into(),
        }
    }
}

/// A tagged OSM primitive.
///
/// Kind-specific predicates (`is_closed`, `is_multipolygon`,
/// `is_connection_node`, `members`) default to the answer for the other
/// kinds, so callers always check [`Primitive::kind`] first.
pub trait Primitive: fmt::Debug + Send + Sync {
    fn id(&self) -> i64;

    fn kind(&self) -> ElementKind;

    fn tags(&self) -> &Tags;

    fn is_modified(&self) -> bool;

    fn is_undeleted(&self) -> bool;

    fn get(&self, key: &str) -> Option<&str> {
        self.tags().get(key).map(String::as_str)
    }

    fn has_key(&self, key: &str) -> bool {
        self.tags().contains_key(key)
    }

    fn is_tagged(&self) -> bool {
        !self.tags().is_empty()
    }

    /// Not yet uploaded: OSM assigns negative ids to new primitives.
    fn is_new(&self) -> bool {
        self.id() <= 0
    }

    fn is_new_or_undeleted(&self) -> bool {
        self.is_new() || self.is_undeleted()
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn is_multipolygon(&self) -> bool {
        false
    }

    fn is_connection_node(&self) -> bool {
        false
    }

    fn members(&self) -> &[Member] {
        &[]
    }

    fn member_ref(&self) -> MemberRef {
        MemberRef {
            kind: self.kind(),
            id: self.id(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub undeleted: bool,
    /// Set by [`DataSet`] when two or more ways share this node.
    #[serde(skip)]
    pub connection: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Way {
    pub id: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub undeleted: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Relation {
    pub id: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub undeleted: bool,
}

impl Primitive for Node {
    fn id(&self) -> i64 {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Node
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn is_undeleted(&self) -> bool {
        self.undeleted
    }

    fn is_connection_node(&self) -> bool {
        self.connection
    }
}

impl Primitive for Way {
    fn id(&self) -> i64 {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Way
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn is_undeleted(&self) -> bool {
        self.undeleted
    }

    fn is_closed(&self) -> bool {
        self.nodes.len() >= 3 && self.nodes.first() == self.nodes.last()
    }
}

impl Primitive for Relation {
    fn id(&self) -> i64 {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Relation
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn is_undeleted(&self) -> bool {
        self.undeleted
    }

    fn is_multipolygon(&self) -> bool {
        matches!(self.get("type"), Some("multipolygon") | Some("boundary"))
    }

    fn members(&self) -> &[Member] {
        &self.members
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDataSet {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    ways: Vec<Way>,
    #[serde(default)]
    relations: Vec<Relation>,
}

/// Read-only entity graph with a parent-relation index.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawDataSet")]
pub struct DataSet {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
    /// Member -> indexes into `relations` of every relation referring to it.
    referrers: HashMap<MemberRef, Vec<usize>>,
}

impl From<RawDataSet> for DataSet {
    fn from(raw: RawDataSet) -> Self {
        DataSet::new(raw.nodes, raw.ways, raw.relations)
    }
}

impl DataSet {
    pub fn new(mut nodes: Vec<Node>, ways: Vec<Way>, relations: Vec<Relation>) -> Self {
        let mut way_refs: HashMap<i64, HashSet<i64>> = HashMap::new();
        for way in &ways {
            for node_id in &way.nodes {
                way_refs.entry(*node_id).or_default().insert(way.id);
            }
        }
        for node in &mut nodes {
            node.connection = way_refs.get(&node.id).is_some_and(|w| w.len() > 1);
        }

        let mut referrers: HashMap<MemberRef, Vec<usize>> = HashMap::new();
        for (idx, relation) in relations.iter().enumerate() {
            for member in &relation.members {
                let entry = referrers.entry(member.member).or_default();
                if entry.last() != Some(&idx) {
                    entry.push(idx);
                }
            }
        }

        Self {
            nodes,
            ways,
            relations,
            referrers,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Data: Failed to parse data set JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Data: Failed to read {:?}", path))?;
        Self::from_json_str(&contents)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All primitives, nodes first, then ways, then relations.
    pub fn primitives(&self) -> impl Iterator<Item = &dyn Primitive> {
        let nodes = self.nodes.iter().map(|n| n as &dyn Primitive);
        let ways = self.ways.iter().map(|w| w as &dyn Primitive);
        let relations = self.relations.iter().map(|r| r as &dyn Primitive);
        nodes.chain(ways).chain(relations)
    }

    pub fn get(&self, member: MemberRef) -> Option<&dyn Primitive> {
        match member.kind {
            ElementKind::Node => self
                .nodes
                .iter()
                .find(|n| n.id == member.id)
                .map(|n| n as &dyn Primitive),
            ElementKind::Way => self
                .ways
                .iter()
                .find(|w| w.id == member.id)
                .map(|w| w as &dyn Primitive),
            ElementKind::Relation => self
                .relations
                .iter()
                .find(|r| r.id == member.id)
                .map(|r| r as &dyn Primitive),
        }
    }

    /// Relations listing `member` in their member list, in data set order.
    pub fn parent_relations(&self, member: MemberRef) -> impl Iterator<Item = &Relation> {
        self.referrers
            .get(&member)
            .into_iter()
            .flatten()
            .map(|idx| &self.relations[*idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn way_closed_requires_three_refs_and_matching_ends() {
        let ring = Way {
            id: 1,
            nodes: vec![1, 2, 3, 1],
            ..Default::default()
        };
        let open = Way {
            id: 2,
            nodes: vec![1, 2, 3],
            ..Default::default()
        };
        let degenerate = Way {
            id: 3,
            nodes: vec![1, 1],
            ..Default::default()
        };
        assert!(ring.is_closed());
        assert!(!open.is_closed());
        assert!(!degenerate.is_closed());
    }

    #[test]
    fn multipolygon_and_boundary_relations() {
        let mp = Relation {
            id: 1,
            tags: tags(&[("type", "multipolygon")]),
            ..Default::default()
        };
        let boundary = Relation {
            id: 2,
            tags: tags(&[("type", "boundary")]),
            ..Default::default()
        };
        let route = Relation {
            id: 3,
            tags: tags(&[("type", "route")]),
            ..Default::default()
        };
        assert!(mp.is_multipolygon());
        assert!(boundary.is_multipolygon());
        assert!(!route.is_multipolygon());
    }

    #[test]
    fn new_and_undeleted_flags() {
        let fresh = Node {
            id: -5,
            ..Default::default()
        };
        let restored = Node {
            id: 7,
            undeleted: true,
            ..Default::default()
        };
        assert!(fresh.is_new());
        assert!(fresh.is_new_or_undeleted());
        assert!(!restored.is_new());
        assert!(restored.is_new_or_undeleted());
    }

    #[test]
    fn data_set_marks_connection_nodes() {
        let nodes = vec![
            Node {
                id: 1,
                ..Default::default()
            },
            Node {
                id: 2,
                ..Default::default()
            },
        ];
        let ways = vec![
            Way {
                id: 10,
                nodes: vec![1, 2],
                ..Default::default()
            },
            Way {
                id: 11,
                nodes: vec![2, 3],
                ..Default::default()
            },
        ];
        let data = DataSet::new(nodes, ways, Vec::new());
        assert!(!data.nodes()[0].is_connection_node());
        assert!(data.nodes()[1].is_connection_node());
    }

    #[test]
    fn parses_json_and_indexes_referrers() {
        let data = DataSet::from_json_str(
            r#"{
                "ways": [{"id": 5, "tags": {"building": "yes"}, "nodes": [1, 2, 3, 1]}],
                "relations": [{
                    "id": 9,
                    "tags": {"type": "multipolygon"},
                    "members": [{"type": "way", "ref": 5, "role": "outer"}]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(data.len(), 2);
        let way_ref = MemberRef {
            kind: ElementKind::Way,
            id: 5,
        };
        let parents: Vec<i64> = data.parent_relations(way_ref).map(|r| r.id).collect();
        assert_eq!(parents, vec![9]);
        assert_eq!(data.relations()[0].members[0].role, "outer");
        assert_eq!(data.get(way_ref).map(|p| p.id()), Some(5));
    }
}
