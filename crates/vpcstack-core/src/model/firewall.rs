//! Firewall policies (security groups) and their ingress rules

use super::Ipv4Cidr;
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of inbound traffic allowed by a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "policy", rename_all = "kebab-case")]
pub enum IngressSource {
    /// Any IPv4 address (`0.0.0.0/0`)
    AnyIpv4,
    /// Any resource carrying the identity of another firewall policy
    Policy(NodeId),
}

impl IngressSource {
    /// Address block for address-based sources
    pub fn cidr(&self) -> Option<Ipv4Cidr> {
        match self {
            IngressSource::AnyIpv4 => Some(Ipv4Cidr::ANY),
            IngressSource::Policy(_) => None,
        }
    }

    pub fn policy(&self) -> Option<&NodeId> {
        match self {
            IngressSource::AnyIpv4 => None,
            IngressSource::Policy(id) => Some(id),
        }
    }
}

/// Protocol and port matched by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "protocol", content = "port", rename_all = "kebab-case")]
pub enum PortSpec {
    Tcp(u16),
    /// ICMP echo request (type 8, any code)
    IcmpPing,
}

impl PortSpec {
    pub const ICMP_ECHO_TYPE: u8 = 8;

    pub fn protocol(&self) -> &'static str {
        match self {
            PortSpec::Tcp(_) => "tcp",
            PortSpec::IcmpPing => "icmp",
        }
    }

    /// Human readable label used in generated rule descriptions
    pub fn label(&self) -> String {
        match self {
            PortSpec::Tcp(port) => port.to_string(),
            PortSpec::IcmpPing => format!("ICMP Type {}", Self::ICMP_ECHO_TYPE),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Tcp(port) => write!(f, "tcp/{}", port),
            PortSpec::IcmpPing => write!(f, "icmp/echo"),
        }
    }
}

/// Allow-rule for inbound traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub source: IngressSource,
    pub port: PortSpec,
    pub description: String,
}

impl IngressRule {
    /// Rule allowing `port` from any IPv4 address
    pub fn from_any_ipv4(port: PortSpec) -> Self {
        Self {
            description: format!("from {}:{}", Ipv4Cidr::ANY, port.label()),
            source: IngressSource::AnyIpv4,
            port,
        }
    }

    /// Rule allowing `port` from members of `policy`
    pub fn from_policy(policy: &FirewallPolicy, port: PortSpec) -> Self {
        Self {
            description: format!("from {}:{}", policy.name, port.label()),
            source: IngressSource::Policy(policy.id.clone()),
            port,
        }
    }
}

/// Named set of allow-rules attached to compute instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPolicy {
    pub id: NodeId,

    /// Provider-visible group name (e.g. "CDK-VPC-SG")
    pub name: String,

    pub description: String,

    /// Whether all outbound traffic is allowed
    pub allow_all_outbound: bool,

    /// Owning network
    pub network: NodeId,

    /// Ingress rules in declaration order
    pub ingress: Vec<IngressRule>,
}

impl FirewallPolicy {
    /// Policies referenced as ingress sources
    pub fn source_policies(&self) -> impl Iterator<Item = &NodeId> {
        self.ingress.iter().filter_map(|rule| rule.source.policy())
    }

    /// Whether any rule admits traffic from an address range
    pub fn admits_addresses(&self) -> bool {
        self.ingress.iter().any(|rule| rule.source.cidr().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_descriptions() {
        let rule = IngressRule::from_any_ipv4(PortSpec::Tcp(22));
        assert_eq!(rule.description, "from 0.0.0.0/0:22");

        let policy = FirewallPolicy {
            id: NodeId::new("VPC-SG"),
            name: "CDK-VPC-SG".to_string(),
            description: String::new(),
            allow_all_outbound: true,
            network: NodeId::new("cdk-vpc"),
            ingress: vec![],
        };
        let rule = IngressRule::from_policy(&policy, PortSpec::IcmpPing);
        assert_eq!(rule.description, "from CDK-VPC-SG:ICMP Type 8");
        assert_eq!(rule.source, IngressSource::Policy(NodeId::new("VPC-SG")));
    }

    #[test]
    fn test_port_display() {
        assert_eq!(PortSpec::Tcp(443).to_string(), "tcp/443");
        assert_eq!(PortSpec::IcmpPing.to_string(), "icmp/echo");
        assert_eq!(PortSpec::IcmpPing.protocol(), "icmp");
    }
}
