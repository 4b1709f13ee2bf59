//! The session network: which datasets the synthetic explorer visited and
//! how it moved between them.
//!
//! The graph is append-only. Every accepted step contributes two edges, a
//! jump edge (how the explorer reached the base dataset) followed by a query
//! edge (the query deriving the new dataset), with timestamps drawn from a
//! single monotonic counter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::DataSet;
use crate::query::Query;

/// How the explorer moved in one step of the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum JumpType {
    /// Continued on the dataset produced by the previous query.
    Stay,
    /// Returned to the previous query's base dataset.
    Back,
    /// Jumped to a uniformly chosen dataset.
    RandomJump,
    /// Derived a new dataset by executing a query.
    Query,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkNode {
    pub dataset_name: String,
    /// Whether the dataset was supplied as input rather than derived.
    pub original: bool,
    pub size: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
    pub jump_type: JumpType,
    /// Set only on `Query` edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    pub timestamp: u64,
}

/// Append-only directed multigraph of the session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Network {
    pub nodes: BTreeMap<String, NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub max_timestamp: u64,
}

impl Network {
    /// Registers a root dataset at timestamp zero.
    pub fn add_root(&mut self, dataset: &DataSet) {
        self.nodes.insert(
            dataset.name.clone(),
            NetworkNode {
                dataset_name: dataset.name.clone(),
                original: true,
                size: dataset.size(),
                timestamp: 0,
            },
        );
    }

    /// Advances and returns the timestamp counter.
    pub fn next_timestamp(&mut self) -> u64 {
        self.max_timestamp += 1;
        self.max_timestamp
    }

    /// Records the jump edge of an accepted step.
    pub fn add_jump(&mut self, from: &str, to: &str, jump_type: JumpType) {
        let timestamp = self.next_timestamp();
        self.edges.push(NetworkEdge {
            from: from.to_string(),
            to: to.to_string(),
            jump_type,
            query: None,
            timestamp,
        });
    }

    /// Records the query edge of an accepted step along with the node for
    /// the derived dataset.
    pub fn add_query(&mut self, query: &Query, derived_size: u64) {
        let timestamp = self.next_timestamp();
        self.edges.push(NetworkEdge {
            from: query.base_name().to_string(),
            to: query.store_name().to_string(),
            jump_type: JumpType::Query,
            query: Some(query.clone()),
            timestamp,
        });
        self.nodes.insert(
            query.store_name().to_string(),
            NetworkNode {
                dataset_name: query.store_name().to_string(),
                original: false,
                size: derived_size,
                timestamp,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn timestamps_are_monotonic_per_edge() {
        let mut network = Network::default();
        let root = DataSet {
            name: "r".into(),
            count: Some(10),
            ..Default::default()
        };
        network.add_root(&root);
        assert_eq!(network.nodes["r"].timestamp, 0);
        assert!(network.nodes["r"].original);

        network.add_jump("", "r", JumpType::RandomJump);
        let mut q = Query::load(Arc::new(root));
        q.set_store("r_1");
        network.add_query(&q, 5);

        assert_eq!(network.edges[0].timestamp, 1);
        assert_eq!(network.edges[1].timestamp, 2);
        assert_eq!(network.max_timestamp, 2);
        assert_eq!(network.edges[1].jump_type, JumpType::Query);
        assert!(network.edges[1].query.is_some());
        assert!(!network.nodes["r_1"].original);
        assert_eq!(network.nodes["r_1"].size, 5);
    }
}
