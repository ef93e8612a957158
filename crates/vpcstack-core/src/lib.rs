//! vpcstack core
//!
//! Builds the desired-state graph of a two-tier network: one network with a
//! public and a private subnet, an internet gateway and a NAT gateway, a
//! public and a private firewall policy, and one instance per tier.
//!
//! ```text
//!            cdk-vpc (10.0.0.0/16)
//!           /        |           \
//!   cdk-vpc-igw   VPC-SG ──permits──> VPC-Priv-SG
//!        |           |                    |
//!  public-subnet ────┼─> PublicInstance   |
//!        |           |                    |
//!  cdk-vpc-nat1 ──> private-subnet ──> PrivateInstance
//! ```
//!
//! Graph construction is synchronous and has no side effects; turning the
//! graph into live resources is left to an external provisioning engine.

pub mod builder;
pub mod error;
pub mod graph;
pub mod model;
pub mod parser;
pub mod validate;

pub use builder::{Topology, TopologyBuilder, build_topology, default_network};
pub use error::{GraphError, Result, SettingsError};
pub use graph::{Edge, EdgeKind, GraphBuilder, NodeId, Resource, ResourceGraph, ResourceKind};
pub use model::*;
pub use parser::{parse_settings_file, parse_settings_string};
pub use validate::{Diagnostic, Severity, ValidationOptions, ValidationReport, validate};
