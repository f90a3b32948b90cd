//! Role inheritance graph with cycle detection
//!
//! Parents are resolved only after every provider has contributed, so a role
//! may inherit from a role supplied by a different provider. Kahn's algorithm
//! verifies the graph is acyclic; when it is not, a DFS reports the cycle path.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AclError, Result};
use crate::provider::RoleProvider;
use crate::types::{RoleEntry, RoleId};

/// Role and its direct parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNode {
    pub id: RoleId,
    pub parents: Vec<RoleId>,
}

/// Merged role set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RoleGraphData")]
pub struct RoleGraph {
    /// Roles in registration order
    nodes: Vec<RoleNode>,

    /// Role id → position in `nodes`
    #[serde(skip)]
    index: HashMap<RoleId, usize>,
}

/// Serialized form of a [`RoleGraph`]; the index is rebuilt on load
#[derive(Deserialize)]
struct RoleGraphData {
    nodes: Vec<RoleNode>,
}

impl TryFrom<RoleGraphData> for RoleGraph {
    type Error = AclError;

    fn try_from(data: RoleGraphData) -> Result<Self> {
        let mut builder = RoleGraphBuilder::new();
        for node in data.nodes {
            builder.add_role(RoleEntry {
                id: node.id,
                parents: node.parents,
            })?;
        }
        builder.build()
    }
}

impl RoleGraph {
    /// Merge the output of every provider into one graph
    pub fn build(providers: &[Arc<dyn RoleProvider>]) -> Result<Self> {
        let mut builder = RoleGraphBuilder::new();
        for provider in providers {
            builder.collect(provider.as_ref())?;
        }
        builder.build()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RoleNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Role ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Direct parents of a role
    pub fn parents(&self, id: &str) -> Result<&[RoleId]> {
        self.get(id)
            .map(|n| n.parents.as_slice())
            .ok_or_else(|| AclError::unknown_role(id))
    }

    /// Whether `role` inherits from `ancestor`
    pub fn inherits(&self, role: &str, ancestor: &str, only_direct: bool) -> Result<bool> {
        let parents = self.parents(role)?;
        if !self.contains(ancestor) {
            return Err(AclError::unknown_role(ancestor));
        }
        if only_direct {
            return Ok(parents.iter().any(|p| p == ancestor));
        }
        Ok(self.ancestry(&[role]).into_iter().skip(1).any(|r| r == ancestor))
    }

    /// Visit order for rule lookup, starting from `start`
    ///
    /// Depth-first: the last listed start role is visited first, and among a
    /// role's parents the last declared one is explored first. Each role
    /// appears once.
    pub fn ancestry<'a>(&'a self, start: &[&'a str]) -> Vec<&'a str> {
        let mut stack: Vec<&str> = start.to_vec();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(node) = self.get(id) {
                for parent in &node.parents {
                    if !visited.contains(parent.as_str()) {
                        stack.push(parent.as_str());
                    }
                }
            }
        }

        order
    }
}

/// Collects role entries from providers and validates them into a [`RoleGraph`]
#[derive(Debug, Default)]
pub struct RoleGraphBuilder {
    entries: Vec<RoleEntry>,
    seen: HashSet<RoleId>,
}

impl RoleGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain one provider
    pub fn collect(&mut self, provider: &dyn RoleProvider) -> Result<usize> {
        let mut count = 0;
        for entry in provider.get_roles()? {
            if entry.id.is_empty() {
                return Err(AclError::invalid_output(provider.name(), "empty role id"));
            }
            self.add_role(entry)?;
            count += 1;
        }
        debug!("Role provider '{}' contributed {} roles", provider.name(), count);
        Ok(count)
    }

    /// Register one role
    pub fn add_role(&mut self, mut entry: RoleEntry) -> Result<()> {
        if !self.seen.insert(entry.id.clone()) {
            return Err(AclError::DuplicateRole(entry.id));
        }

        let mut unique = HashSet::new();
        entry.parents.retain(|p| unique.insert(p.clone()));
        self.entries.push(entry);
        Ok(())
    }

    /// Resolve parents and verify the graph is acyclic
    pub fn build(self) -> Result<RoleGraph> {
        for entry in &self.entries {
            for parent in &entry.parents {
                if parent == &entry.id {
                    return Err(AclError::CircularRoleInheritance(format!(
                        "{} -> {}",
                        entry.id, parent
                    )));
                }
                if !self.seen.contains(parent) {
                    return Err(AclError::UnknownRoleReference {
                        role: entry.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let index: HashMap<RoleId, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        self.verify_acyclic(&index)?;

        let nodes = self
            .entries
            .into_iter()
            .map(|e| RoleNode {
                id: e.id,
                parents: e.parents,
            })
            .collect();

        Ok(RoleGraph { nodes, index })
    }

    /// Kahn's algorithm over parent edges
    fn verify_acyclic(&self, index: &HashMap<RoleId, usize>) -> Result<()> {
        let n = self.entries.len();
        let mut in_degree = vec![0usize; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, entry) in self.entries.iter().enumerate() {
            for parent in &entry.parents {
                let p = index[parent];
                children[p].push(i);
                in_degree[i] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;

        while let Some(current) = queue.pop_front() {
            visited += 1;
            for &child in &children[current] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if visited == n {
            return Ok(());
        }

        let cycle = self
            .find_cycle(index)
            .unwrap_or_else(|| "unknown cycle".to_string());
        Err(AclError::CircularRoleInheritance(cycle))
    }

    /// DFS with white/gray/black marking; returns the first cycle path found
    fn find_cycle(&self, index: &HashMap<RoleId, usize>) -> Option<String> {
        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state = vec![0u8; self.entries.len()];
        let mut path = Vec::new();

        for start in 0..self.entries.len() {
            if state[start] == 0 {
                if let Some(cycle) = self.dfs(start, index, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs(
        &self,
        node: usize,
        index: &HashMap<RoleId, usize>,
        state: &mut [u8],
        path: &mut Vec<usize>,
    ) -> Option<String> {
        match state[node] {
            1 => {
                let start = path.iter().position(|&n| n == node)?;
                let cycle: Vec<&str> = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(|&i| self.entries[i].id.as_str())
                    .collect();
                return Some(cycle.join(" -> "));
            }
            2 => return None,
            _ => {}
        }

        state[node] = 1;
        path.push(node);
        for parent in &self.entries[node].parents {
            if let Some(cycle) = self.dfs(index[parent], index, state, path) {
                return Some(cycle);
            }
        }
        state[node] = 2;
        path.pop();
        None
    }
}
