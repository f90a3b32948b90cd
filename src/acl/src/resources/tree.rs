//! Single-parent resource tree

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AclError, Result};
use crate::provider::ResourceProvider;
use crate::types::{Privilege, ResourceEntry, ResourceId};

/// Resource with its parent and declared privileges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: ResourceId,
    pub parent: Option<ResourceId>,
    pub privileges: Vec<Privilege>,
}

/// Merged resource tree
///
/// Nodes are stored parents-first: a resource never precedes its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ResourceTreeData")]
pub struct ResourceTree {
    nodes: Vec<ResourceNode>,
    #[serde(skip)]
    index: HashMap<ResourceId, usize>,
}

/// Serialized form; loading re-runs the builder checks and rebuilds the index
#[derive(Deserialize)]
struct ResourceTreeData {
    nodes: Vec<ResourceNode>,
}

impl TryFrom<ResourceTreeData> for ResourceTree {
    type Error = AclError;

    fn try_from(data: ResourceTreeData) -> Result<Self> {
        let mut builder = ResourceTreeBuilder::new();
        for node in data.nodes {
            builder.add_resource(ResourceEntry {
                id: node.id,
                parent: node.parent,
                privileges: node.privileges,
            })?;
        }
        builder.build()
    }
}

impl ResourceTree {
    /// Merge the output of every provider into one tree
    pub fn build(providers: &[Arc<dyn ResourceProvider>]) -> Result<Self> {
        let mut builder = ResourceTreeBuilder::new();
        for provider in providers {
            builder.collect(provider.as_ref())?;
        }
        builder.build()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resource ids, parents before children
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn parent(&self, id: &str) -> Result<Option<&str>> {
        self.get(id)
            .map(|n| n.parent.as_deref())
            .ok_or_else(|| AclError::unknown_resource(id))
    }

    /// `id` followed by its ancestors up to the root
    pub fn ancestry<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|n| n.id.as_str());
        while let Some(resource) = current {
            chain.push(resource);
            current = self.get(resource).and_then(|n| n.parent.as_deref());
        }
        chain
    }

    /// Whether `resource` sits below `ancestor`
    pub fn inherits(&self, resource: &str, ancestor: &str, only_direct: bool) -> Result<bool> {
        let parent = self.parent(resource)?;
        if !self.contains(ancestor) {
            return Err(AclError::unknown_resource(ancestor));
        }
        if only_direct {
            return Ok(parent == Some(ancestor));
        }
        Ok(self.ancestry(resource).into_iter().skip(1).any(|r| r == ancestor))
    }

    /// Union of every privilege declared by any resource
    pub fn privileges(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .flat_map(|n| n.privileges.iter().map(String::as_str))
            .collect()
    }
}

/// Collects resource entries and resolves them into a [`ResourceTree`]
///
/// A child may arrive before its parent (even from an earlier provider);
/// parents are resolved once every provider has been drained.
#[derive(Debug, Default)]
pub struct ResourceTreeBuilder {
    pending: Vec<ResourceEntry>,
    seen: HashSet<ResourceId>,
}

impl ResourceTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain one provider
    pub fn collect(&mut self, provider: &dyn ResourceProvider) -> Result<usize> {
        let mut count = 0;
        for entry in provider.get_resources()? {
            if entry.id.is_empty() {
                return Err(AclError::invalid_output(provider.name(), "empty resource id"));
            }
            self.add_resource(entry)?;
            count += 1;
        }
        debug!("Resource provider '{}' contributed {} resources", provider.name(), count);
        Ok(count)
    }

    /// Register one resource
    pub fn add_resource(&mut self, entry: ResourceEntry) -> Result<()> {
        if !self.seen.insert(entry.id.clone()) {
            return Err(AclError::DuplicateResource(entry.id));
        }
        self.pending.push(entry);
        Ok(())
    }

    /// Attach every resource to its parent
    ///
    /// One topological pass from the roots; entries never reached sit on, or
    /// below, a cycle.
    pub fn build(self) -> Result<ResourceTree> {
        let pending = self.pending;
        let position: HashMap<&str, usize> = pending
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for (i, entry) in pending.iter().enumerate() {
            match entry.parent.as_deref() {
                None => queue.push_back(i),
                Some(parent) => match position.get(parent) {
                    Some(&p) => children[p].push(i),
                    None => {
                        return Err(AclError::UnknownResourceParent {
                            resource: entry.id.clone(),
                            parent: parent.to_string(),
                        })
                    }
                },
            }
        }

        let mut order = Vec::with_capacity(pending.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            queue.extend(children[i].iter().copied());
        }

        if order.len() < pending.len() {
            let mut placed = vec![false; pending.len()];
            for &i in &order {
                placed[i] = true;
            }
            let leftovers: Vec<&ResourceEntry> = pending
                .iter()
                .enumerate()
                .filter(|(i, _)| !placed[*i])
                .map(|(_, e)| e)
                .collect();
            return Err(Self::cycle(&leftovers));
        }

        let mut slots: Vec<Option<ResourceEntry>> = pending.into_iter().map(Some).collect();
        let mut tree = ResourceTree::default();
        for i in order {
            let Some(entry) = slots[i].take() else {
                continue;
            };
            let mut privileges = entry.privileges;
            let mut unique = HashSet::new();
            privileges.retain(|p| unique.insert(p.clone()));

            tree.index.insert(entry.id.clone(), tree.nodes.len());
            tree.nodes.push(ResourceNode {
                id: entry.id,
                parent: entry.parent,
                privileges,
            });
        }
        Ok(tree)
    }

    /// Every leftover parent exists, so the leftovers contain a cycle
    fn cycle(leftovers: &[&ResourceEntry]) -> AclError {
        let parents: HashMap<&str, &str> = leftovers
            .iter()
            .filter_map(|e| e.parent.as_deref().map(|p| (e.id.as_str(), p)))
            .collect();
        let Some(first) = leftovers.first() else {
            return AclError::CircularResourceHierarchy("unknown cycle".to_string());
        };

        let mut path: Vec<&str> = Vec::new();
        let mut current = first.id.as_str();
        while !path.contains(&current) {
            path.push(current);
            match parents.get(current) {
                Some(parent) => current = *parent,
                None => break,
            }
        }
        let start = path.iter().position(|&r| r == current).unwrap_or(0);
        let mut cycle = path[start..].to_vec();
        cycle.push(current);
        AclError::CircularResourceHierarchy(cycle.join(" -> "))
    }
}
