//! Desired-state resource graph
//!
//! Nodes are resources keyed by logical id, edges are typed dependencies.
//! An edge always points from the resource that must exist first to the
//! resource that depends on it, so a topological walk of the graph is a
//! valid creation order.

use crate::error::{GraphError, Result};
use crate::model::{
    ComputeInstance, FirewallPolicy, InternetGateway, NatGateway, Network, StackContext, Subnet,
};
use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Logical id of a resource (e.g. "cdk-vpc", "VPC-SG")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Network,
    Subnet,
    InternetGateway,
    NatGateway,
    FirewallPolicy,
    Instance,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::InternetGateway => write!(f, "internet-gateway"),
            ResourceKind::NatGateway => write!(f, "nat-gateway"),
            ResourceKind::FirewallPolicy => write!(f, "firewall-policy"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// A node of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource", rename_all = "kebab-case")]
pub enum Resource {
    Network(Network),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    NatGateway(NatGateway),
    FirewallPolicy(FirewallPolicy),
    Instance(ComputeInstance),
}

impl Resource {
    pub fn id(&self) -> &NodeId {
        match self {
            Resource::Network(r) => &r.id,
            Resource::Subnet(r) => &r.id,
            Resource::InternetGateway(r) => &r.id,
            Resource::NatGateway(r) => &r.id,
            Resource::FirewallPolicy(r) => &r.id,
            Resource::Instance(r) => &r.id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Network(_) => ResourceKind::Network,
            Resource::Subnet(_) => ResourceKind::Subnet,
            Resource::InternetGateway(_) => ResourceKind::InternetGateway,
            Resource::NatGateway(_) => ResourceKind::NatGateway,
            Resource::FirewallPolicy(_) => ResourceKind::FirewallPolicy,
            Resource::Instance(_) => ResourceKind::Instance,
        }
    }

    pub fn as_subnet(&self) -> Option<&Subnet> {
        match self {
            Resource::Subnet(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&FirewallPolicy> {
        match self {
            Resource::FirewallPolicy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&ComputeInstance> {
        match self {
            Resource::Instance(i) => Some(i),
            _ => None,
        }
    }
}

/// Relationship carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Parent owns child; the child cannot outlive it
    Owns,
    /// Source policy's identity is admitted by the target policy
    Permits,
    /// Subnet hosts the instance
    PlacedIn,
    /// Policy is attached to the instance
    ProtectedBy,
    /// Gateway is the default route target of the subnet
    RoutesVia,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Owns => write!(f, "owns"),
            EdgeKind::Permits => write!(f, "permits"),
            EdgeKind::PlacedIn => write!(f, "placed-in"),
            EdgeKind::ProtectedBy => write!(f, "protected-by"),
            EdgeKind::RoutesVia => write!(f, "routes-via"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.from, self.kind, self.to)
    }
}

/// Mutable assembly area for a [`ResourceGraph`]
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    context: StackContext,
    nodes: IndexMap<NodeId, Resource>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new(context: StackContext) -> Self {
        Self {
            context,
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn add_node(&mut self, resource: Resource) -> Result<()> {
        let id = resource.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id.to_string()));
        }
        self.nodes.insert(id, resource);
        Ok(())
    }

    /// Swap a declared node for a new record with the same id
    pub fn replace_node(&mut self, resource: Resource) -> Result<()> {
        match self.nodes.get_mut(resource.id()) {
            Some(slot) => {
                *slot = resource;
                Ok(())
            }
            None => Err(GraphError::UnknownNode(resource.id().to_string())),
        }
    }

    /// Add an edge between two declared nodes. Repeated edges are kept once.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId, kind: EdgeKind) -> Result<()> {
        for id in [from, to] {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::UnknownNode(id.to_string()));
            }
        }

        let edge = Edge::new(from.clone(), to.clone(), kind);
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    pub fn retain_edges(&mut self, keep: impl FnMut(&Edge) -> bool) {
        self.edges.retain(keep);
    }

    /// Check the graph is acyclic and freeze it
    pub fn freeze(self) -> Result<ResourceGraph> {
        let order = topological_sort(&self.nodes, &self.edges)?;
        Ok(ResourceGraph {
            context: self.context,
            nodes: self.nodes,
            edges: self.edges,
            order,
        })
    }
}

/// Dependency graph over declaration indices: node `i` is the `i`-th
/// declared resource
fn dependency_graph(
    nodes: &IndexMap<NodeId, Resource>,
    edges: &[Edge],
) -> Result<DiGraph<NodeId, EdgeKind>> {
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
    for id in nodes.keys() {
        graph.add_node(id.clone());
    }

    let index_of = |id: &NodeId| {
        nodes
            .get_index_of(id)
            .map(NodeIndex::new)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    };
    for edge in edges {
        graph.add_edge(index_of(&edge.from)?, index_of(&edge.to)?, edge.kind);
    }
    Ok(graph)
}

/// Kahn's algorithm; among ready nodes the earliest declared wins.
fn topological_sort(nodes: &IndexMap<NodeId, Resource>, edges: &[Edge]) -> Result<Vec<NodeId>> {
    let graph = dependency_graph(nodes, edges)?;

    if is_cyclic_directed(&graph) {
        let mut stuck: Vec<NodeIndex> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .collect();
        stuck.sort();
        let names: Vec<&str> = stuck.iter().map(|&ix| graph[ix].as_str()).collect();
        return Err(GraphError::CycleDetected(names.join(", ")));
    }

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|ix| graph.neighbors_directed(ix, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<NodeIndex> = graph
        .node_indices()
        .filter(|ix| in_degree[ix.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(ix) = ready.pop_first() {
        order.push(graph[ix].clone());
        for next in graph.neighbors_directed(ix, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.insert(next);
            }
        }
    }

    Ok(order)
}

/// Immutable, acyclic desired-state graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGraph {
    context: StackContext,
    nodes: IndexMap<NodeId, Resource>,
    edges: Vec<Edge>,
    #[serde(skip)]
    order: Vec<NodeId>,
}

impl ResourceGraph {
    pub fn context(&self) -> &StackContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Resource> {
        self.nodes.get(id)
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_from<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.from == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.to == id)
    }

    pub fn has_edge(&self, from: &NodeId, to: &NodeId, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| &e.from == from && &e.to == to && e.kind == kind)
    }

    /// Direct dependencies of a node, in creation order
    pub fn dependencies_of(&self, id: &NodeId) -> Vec<&NodeId> {
        let direct: BTreeSet<&NodeId> = self.edges_to(id).map(|e| &e.from).collect();
        self.order.iter().filter(|n| direct.contains(n)).collect()
    }

    /// Creation order: every node appears after all of its dependencies
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.nodes.values().filter_map(Resource::as_subnet)
    }

    pub fn policies(&self) -> impl Iterator<Item = &FirewallPolicy> {
        self.nodes.values().filter_map(Resource::as_policy)
    }

    pub fn instances(&self) -> impl Iterator<Item = &ComputeInstance> {
        self.nodes.values().filter_map(Resource::as_instance)
    }

    /// Open a builder seeded with this graph's nodes and edges
    pub fn rebuild(&self) -> GraphBuilder {
        GraphBuilder {
            context: self.context.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}
