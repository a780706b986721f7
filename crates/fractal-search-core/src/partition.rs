//! Fractal partitioner: recursive binary splitting by seed similarity.
//!
//! A simplified divisive hierarchical clustering. The root holds every
//! document; any node with more than `max_documents` members (and at least
//! two) is split in two and the children are processed the same way.
//!
//! # Split rule
//!
//! 1. The seeds are the first two members in input order.
//! 2. Every member (seeds included) goes to arm `0` if its similarity to
//!    seed 1 is `>=` its similarity to seed 2, otherwise to arm `1`.
//! 3. Children are labelled `<parent>.0` and `<parent>.1`.
//! 4. If either arm comes out empty the node stays a leaf. Splitting the
//!    same ordered set again would pick the same seeds and loop forever.
//!
//! Seeds and tie-break are part of the output contract: the same documents
//! in the same order always get the same labels.
//!
//! The tree is an arena of [`ClusterNode`]s addressed by [`NodeId`], built
//! with an explicit worklist so deep trees never grow the call stack.
//!
//! # Example
//!
//! ```rust
//! use fractal_search_core::document::Document;
//! use fractal_search_core::partition::compute_labels;
//!
//! let docs = vec![
//!     Document::new("d1", "python programming language").unwrap(),
//!     Document::new("d2", "python web development").unwrap(),
//!     Document::new("d3", "java programming language").unwrap(),
//! ];
//! let labels = compute_labels(&docs, 1).unwrap();
//! assert_eq!(labels.get("d1"), Some("root.0.0"));
//! assert_eq!(labels.get("d3"), Some("root.0.1"));
//! assert_eq!(labels.get("d2"), Some("root.1"));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::similarity::{Jaccard, Similarity};

/// Label of the tree root.
pub const ROOT_LABEL: &str = "root";

/// Index of a node inside a [`ClusterTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One node of the partition tree.
#[derive(Debug, Clone)]
pub struct ClusterNode {
    /// Dot-delimited path from the root, e.g. `root.0.1`.
    pub label: String,
    /// Indices into the partitioned document slice, in parent order.
    pub members: Vec<usize>,
    /// 0 at the root, +1 per split.
    pub depth: usize,
    /// `(arm 0, arm 1)` for internal nodes, `None` for leaves.
    pub children: Option<(NodeId, NodeId)>,
    /// Set when a split was attempted but one arm came out empty.
    pub degenerate: bool,
}

impl ClusterNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Immutable binary tree produced by [`Partitioner::build_tree`].
#[derive(Debug, Clone)]
pub struct ClusterTree {
    nodes: Vec<ClusterNode>,
}

impl ClusterTree {
    pub fn root(&self) -> &ClusterNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&ClusterNode> {
        self.nodes.get(id.0)
    }

    /// Total number of nodes, internal and leaf.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Map every document id to the label of the leaf that holds it.
    ///
    /// `documents` must be the slice the tree was built from.
    pub fn label_mapping(&self, documents: &[Document]) -> LabelMapping {
        let mut labels = BTreeMap::new();
        for leaf in self.leaves() {
            for &m in &leaf.members {
                labels.insert(documents[m].id().to_string(), leaf.label.clone());
            }
        }
        LabelMapping { labels }
    }
}

/// Document id → leaf label. The only artifact consumed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMapping {
    labels: BTreeMap<String, String>,
}

impl LabelMapping {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(id, label)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Distinct labels in use.
    pub fn labels(&self) -> BTreeSet<&str> {
        self.labels.values().map(String::as_str).collect()
    }

    /// Ids carrying `label`, in id order.
    pub fn members_of(&self, label: &str) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, l)| l.as_str() == label)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Recursive splitter parameterized by leaf size and similarity measure.
#[derive(Debug, Clone)]
pub struct Partitioner<S = Jaccard> {
    max_documents: usize,
    similarity: S,
}

impl Partitioner<Jaccard> {
    pub fn new(max_documents: usize) -> Self {
        Self::with_similarity(max_documents, Jaccard)
    }
}

impl<S: Similarity> Partitioner<S> {
    pub fn with_similarity(max_documents: usize, similarity: S) -> Self {
        Self {
            max_documents,
            similarity,
        }
    }

    pub fn max_documents(&self) -> usize {
        self.max_documents
    }

    /// Partition `documents` and return the id → label mapping.
    ///
    /// An empty input yields an empty mapping.
    pub fn compute_labels(&self, documents: &[Document]) -> Result<LabelMapping> {
        self.validate(documents)?;
        if documents.is_empty() {
            return Ok(LabelMapping::default());
        }
        let tree = self.build_tree(documents)?;
        let mapping = tree.label_mapping(documents);
        info!(
            documents = documents.len(),
            max_documents = self.max_documents,
            nodes = tree.len(),
            labels = mapping.labels().len(),
            depth = tree.max_depth(),
            "partitioned documents"
        );
        Ok(mapping)
    }

    /// Build the full partition tree over `documents`.
    ///
    /// Fails on an empty input, since the root would be an empty leaf.
    pub fn build_tree(&self, documents: &[Document]) -> Result<ClusterTree> {
        self.validate(documents)?;
        if documents.is_empty() {
            return Err(Error::invalid("cannot partition an empty document set"));
        }

        let mut nodes = vec![ClusterNode {
            label: ROOT_LABEL.to_string(),
            members: (0..documents.len()).collect(),
            depth: 0,
            children: None,
            degenerate: false,
        }];
        let mut pending = vec![NodeId(0)];

        while let Some(id) = pending.pop() {
            let node = &nodes[id.0];
            if !self.should_split(node.members.len()) {
                continue;
            }

            let (arm0, arm1) = self.split(documents, &node.members);
            if arm0.is_empty() || arm1.is_empty() {
                debug!(
                    label = %node.label,
                    members = node.members.len(),
                    "degenerate split, keeping node as leaf"
                );
                nodes[id.0].degenerate = true;
                continue;
            }

            debug!(
                label = %node.label,
                arm0 = arm0.len(),
                arm1 = arm1.len(),
                "split node"
            );

            let depth = node.depth + 1;
            let left_label = format!("{}.0", node.label);
            let right_label = format!("{}.1", node.label);

            let left = NodeId(nodes.len());
            nodes.push(ClusterNode {
                label: left_label,
                members: arm0,
                depth,
                children: None,
                degenerate: false,
            });
            let right = NodeId(nodes.len());
            nodes.push(ClusterNode {
                label: right_label,
                members: arm1,
                depth,
                children: None,
                degenerate: false,
            });
            nodes[id.0].children = Some((left, right));

            pending.push(right);
            pending.push(left);
        }

        Ok(ClusterTree { nodes })
    }

    fn should_split(&self, len: usize) -> bool {
        len > self.max_documents && len >= 2
    }

    /// Route each member to arm 0 or arm 1. Ties go to arm 0.
    fn split(&self, documents: &[Document], members: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let seed1 = &documents[members[0]];
        let seed2 = &documents[members[1]];

        let mut arm0 = Vec::new();
        let mut arm1 = Vec::new();
        for &m in members {
            let doc = &documents[m];
            let sim1 = self.similarity.similarity(doc, seed1);
            let sim2 = self.similarity.similarity(doc, seed2);
            if sim1 >= sim2 {
                arm0.push(m);
            } else {
                arm1.push(m);
            }
        }
        (arm0, arm1)
    }

    fn validate(&self, documents: &[Document]) -> Result<()> {
        if self.max_documents < 1 {
            return Err(Error::invalid("max_documents must be >= 1"));
        }
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in documents {
            if !seen.insert(doc.id()) {
                return Err(Error::invalid(format!(
                    "duplicate document id: {}",
                    doc.id()
                )));
            }
        }
        Ok(())
    }
}

/// Partition `documents` with Jaccard similarity.
pub fn compute_labels(documents: &[Document], max_documents: usize) -> Result<LabelMapping> {
    Partitioner::new(max_documents).compute_labels(documents)
}
