//! Network resources: the VPC, its subnets and egress gateways

use super::Ipv4Cidr;
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tier of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetKind {
    /// Routed to the internet gateway; instances get a public address
    Public,
    /// Routed to a NAT gateway; reachable only from inside the network
    PrivateWithNat,
}

impl SubnetKind {
    pub fn is_public(&self) -> bool {
        matches!(self, SubnetKind::Public)
    }
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetKind::Public => write!(f, "public"),
            SubnetKind::PrivateWithNat => write!(f, "private-with-nat"),
        }
    }
}

/// Per-tier subnet template, expanded once per availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfiguration {
    /// Group name (e.g. "public-subnet-1")
    pub name: String,

    pub kind: SubnetKind,

    /// Prefix length of each subnet carved for this group
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, kind: SubnetKind, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            cidr_mask,
        }
    }
}

/// Virtual network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NodeId,

    /// Address block (default `10.0.0.0/16`)
    pub cidr: Ipv4Cidr,

    /// Number of availability zones the subnets span (default 1)
    pub max_azs: u32,

    /// Number of NAT egress points (default 1)
    pub nat_gateways: u32,

    /// Subnet groups, in allocation order
    pub subnet_configuration: Vec<SubnetConfiguration>,
}

/// Where a subnet's default route (`0.0.0.0/0`) points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "via", content = "target", rename_all = "kebab-case")]
pub enum DefaultRoute {
    InternetGateway(NodeId),
    NatGateway(NodeId),
}

impl DefaultRoute {
    pub fn target(&self) -> &NodeId {
        match self {
            DefaultRoute::InternetGateway(id) | DefaultRoute::NatGateway(id) => id,
        }
    }
}

/// Subnet owned by a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: NodeId,

    /// Subnet group name this subnet was expanded from
    pub name: String,

    pub kind: SubnetKind,

    pub cidr: Ipv4Cidr,

    /// Owning network
    pub network: NodeId,

    /// Zero-based availability zone index
    pub availability_zone_index: u32,

    pub map_public_ip_on_launch: bool,

    pub route: DefaultRoute,
}

/// Internet gateway attached to a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub id: NodeId,
    pub network: NodeId,
}

/// Managed NAT egress point, placed in a public subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    pub id: NodeId,
    pub subnet: NodeId,
}
