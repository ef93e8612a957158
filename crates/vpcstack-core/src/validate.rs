//! Structural checks on a frozen graph
//!
//! Freezing already guarantees unique ids, known edge endpoints and no
//! cycles. The checks here cover the topology rules: placement and
//! protection of instances, tier matching, and completeness of the
//! permission edges between firewall policies.

use crate::graph::{Edge, EdgeKind, NodeId, Resource, ResourceGraph, ResourceKind};
use crate::model::{ComputeInstance, FirewallPolicy, SubnetKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Treat an instance without a key pair as an error instead of a warning
    pub require_key_pair: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Resource the diagnostic is about
    pub resource: NodeId,

    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.resource, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// True when no diagnostic is an error
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, resource: &NodeId, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            resource: resource.clone(),
            message: message.into(),
        });
    }

    fn error(&mut self, resource: &NodeId, message: impl Into<String>) {
        self.push(Severity::Error, resource, message);
    }
}

/// Run every check and collect the findings
pub fn validate(graph: &ResourceGraph, options: &ValidationOptions) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_subnet_ownership(graph, &mut report);
    check_permission_edges(graph, &mut report);

    let mut protected: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
    for instance in graph.instances() {
        check_instance(graph, instance, options, &mut report);
        protected
            .entry(&instance.policy)
            .or_default()
            .push(&instance.id);
    }

    for (policy, instances) in protected {
        if instances.len() > 1 {
            let names: Vec<&str> = instances.iter().map(|i| i.as_str()).collect();
            report.error(
                policy,
                format!("policy is shared by instances {}", names.join(", ")),
            );
        }
    }

    for diagnostic in report.warnings() {
        tracing::warn!("{}", diagnostic);
    }
    report
}

fn check_subnet_ownership(graph: &ResourceGraph, report: &mut ValidationReport) {
    for subnet in graph.subnets() {
        let owners: Vec<&Edge> = graph
            .edges_to(&subnet.id)
            .filter(|e| e.kind == EdgeKind::Owns)
            .filter(|e| matches!(graph.node(&e.from), Some(Resource::Network(_))))
            .collect();

        match owners.as_slice() {
            [owner] if owner.from == subnet.network => {}
            [] => report.error(&subnet.id, "subnet is not owned by a network"),
            [owner] => report.error(
                &subnet.id,
                format!(
                    "subnet names network {} but is owned by {}",
                    subnet.network, owner.from
                ),
            ),
            _ => report.error(&subnet.id, "subnet is owned by more than one network"),
        }
    }
}

fn check_permission_edges(graph: &ResourceGraph, report: &mut ValidationReport) {
    for policy in graph.policies() {
        for source in policy.source_policies() {
            match graph.node(source).map(Resource::kind) {
                Some(ResourceKind::FirewallPolicy) => {}
                Some(kind) => report.error(
                    &policy.id,
                    format!("ingress source {} is a {}, not a firewall policy", source, kind),
                ),
                None => report.error(
                    &policy.id,
                    format!("ingress source {} does not exist", source),
                ),
            }

            if !graph.has_edge(source, &policy.id, EdgeKind::Permits) {
                report.error(
                    &policy.id,
                    format!("missing permission edge from {}", source),
                );
            }
        }

        // every permission edge must be backed by a rule
        for edge in graph
            .edges_to(&policy.id)
            .filter(|e| e.kind == EdgeKind::Permits)
        {
            if !policy.source_policies().any(|s| s == &edge.from) {
                report.error(
                    &policy.id,
                    format!("permission edge from {} has no ingress rule", edge.from),
                );
            }
        }
    }

    // permissions flow from the public tier into the private tier only
    for edge in graph.edges().iter().filter(|e| e.kind == EdgeKind::Permits) {
        let from_tier = policy_tier(graph, &edge.from);
        let to_tier = policy_tier(graph, &edge.to);
        if from_tier == Some(SubnetKind::PrivateWithNat) && to_tier == Some(SubnetKind::Public) {
            report.error(
                &edge.to,
                format!(
                    "private-tier policy {} must not grant access to the public tier",
                    edge.from
                ),
            );
        }
    }
}

/// Tier of the subnet hosting the instance a policy protects
fn policy_tier(graph: &ResourceGraph, policy: &NodeId) -> Option<SubnetKind> {
    graph
        .instances()
        .find(|i| &i.policy == policy)
        .and_then(|i| graph.node(&i.subnet))
        .and_then(Resource::as_subnet)
        .map(|s| s.kind)
}

fn check_instance(
    graph: &ResourceGraph,
    instance: &ComputeInstance,
    options: &ValidationOptions,
    report: &mut ValidationReport,
) {
    let placements: Vec<&NodeId> = graph
        .edges_to(&instance.id)
        .filter(|e| e.kind == EdgeKind::PlacedIn)
        .map(|e| &e.from)
        .collect();
    match placements.as_slice() {
        [subnet] if *subnet == &instance.subnet => {}
        [] => report.error(&instance.id, "instance is not placed in a subnet"),
        [subnet] => report.error(
            &instance.id,
            format!(
                "instance names subnet {} but is placed in {}",
                instance.subnet, subnet
            ),
        ),
        _ => report.error(&instance.id, "instance is placed in more than one subnet"),
    }

    let protections: Vec<&NodeId> = graph
        .edges_to(&instance.id)
        .filter(|e| e.kind == EdgeKind::ProtectedBy)
        .map(|e| &e.from)
        .collect();
    match protections.as_slice() {
        [policy] if *policy == &instance.policy => {}
        [] => report.error(&instance.id, "instance is not protected by a firewall policy"),
        [policy] => report.error(
            &instance.id,
            format!(
                "instance names policy {} but is protected by {}",
                instance.policy, policy
            ),
        ),
        _ => report.error(
            &instance.id,
            "instance is protected by more than one firewall policy",
        ),
    }

    let subnet = graph.node(&instance.subnet).and_then(Resource::as_subnet);
    let policy = graph.node(&instance.policy).and_then(Resource::as_policy);
    if let (Some(subnet), Some(policy)) = (subnet, policy) {
        check_tier(instance, subnet.kind, policy, report);
    }

    if instance.key_name.is_none() {
        let severity = if options.require_key_pair {
            Severity::Error
        } else {
            Severity::Warning
        };
        report.push(severity, &instance.id, "no key pair configured");
    }
}

fn check_tier(
    instance: &ComputeInstance,
    tier: SubnetKind,
    policy: &FirewallPolicy,
    report: &mut ValidationReport,
) {
    match tier {
        SubnetKind::Public => {
            if !policy.admits_addresses() {
                report.error(
                    &instance.id,
                    format!(
                        "public instance is protected by {}, which admits no address range",
                        policy.name
                    ),
                );
            }
        }
        SubnetKind::PrivateWithNat => {
            if policy.ingress.is_empty() {
                report.error(&policy.id, "private policy has no ingress sources");
            } else if policy.admits_addresses() {
                report.error(
                    &instance.id,
                    format!(
                        "private instance is protected by {}, which admits address ranges",
                        policy.name
                    ),
                );
            }
        }
    }
}
