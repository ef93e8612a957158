//! Synthesis of a resource graph into the document handed to the
//! provisioning engine

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tokio::fs;
use vpcstack_core::{
    ComputeInstance, FirewallPolicy, IngressSource, InternetGateway, NatGateway, Network,
    PortSpec, Resource, ResourceGraph, ResourceKind, Subnet,
};

pub const PROVIDER: &str = "aws";
pub const DOCUMENT_VERSION: u32 = 1;

/// Set of resources to be managed, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by type and ID
    pub resources: IndexMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&ResourceConfig> {
        let key = format!("{}:{}", resource_type, id);
        self.resources.get(&key)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }
}

/// Configuration for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "network", "firewall-policy")
    pub resource_type: String,

    /// Provider-native type (e.g., "AWS::EC2::VPC")
    pub provider_type: String,

    /// Logical resource identifier
    pub id: String,

    /// Provider name
    pub provider: String,

    /// Resource-specific configuration
    pub config: Value,

    /// Logical ids that must exist before this resource, in creation order
    pub depends_on: Vec<String>,
}

impl ResourceConfig {
    /// Get the full resource key (type:id)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }
}

/// Provider-native type name for a resource kind
pub fn provider_type(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Network => "AWS::EC2::VPC",
        ResourceKind::Subnet => "AWS::EC2::Subnet",
        ResourceKind::InternetGateway => "AWS::EC2::InternetGateway",
        ResourceKind::NatGateway => "AWS::EC2::NatGateway",
        ResourceKind::FirewallPolicy => "AWS::EC2::SecurityGroup",
        ResourceKind::Instance => "AWS::EC2::Instance",
    }
}

/// Convert every node of `graph` to a [`ResourceConfig`], in creation order
pub fn synthesize(graph: &ResourceGraph) -> ResourceSet {
    let mut set = ResourceSet::new();

    for id in graph.topological_order() {
        let Some(resource) = graph.node(id) else {
            continue;
        };
        let depends_on = graph
            .dependencies_of(id)
            .into_iter()
            .map(|d| d.to_string())
            .collect();

        set.add(ResourceConfig {
            resource_type: resource.kind().to_string(),
            provider_type: provider_type(resource.kind()).to_string(),
            id: id.to_string(),
            provider: PROVIDER.to_string(),
            config: resource_config(resource),
            depends_on,
        });
    }

    tracing::debug!("Synthesized {} resources", set.len());
    set
}

fn resource_config(resource: &Resource) -> Value {
    match resource {
        Resource::Network(network) => network_config(network),
        Resource::Subnet(subnet) => subnet_config(subnet),
        Resource::InternetGateway(igw) => internet_gateway_config(igw),
        Resource::NatGateway(nat) => nat_gateway_config(nat),
        Resource::FirewallPolicy(policy) => policy_config(policy),
        Resource::Instance(instance) => instance_config(instance),
    }
}

fn network_config(network: &Network) -> Value {
    json!({
        "cidr_block": network.cidr.to_string(),
        "max_azs": network.max_azs,
        "nat_gateways": network.nat_gateways,
        "enable_dns_hostnames": true,
        "enable_dns_support": true,
    })
}

fn subnet_config(subnet: &Subnet) -> Value {
    json!({
        "name": subnet.name,
        "vpc": subnet.network.as_str(),
        "subnet_type": subnet.kind.to_string(),
        "cidr_block": subnet.cidr.to_string(),
        "availability_zone_index": subnet.availability_zone_index,
        "map_public_ip_on_launch": subnet.map_public_ip_on_launch,
        "default_route": {
            "destination": "0.0.0.0/0",
            "target": subnet.route.target().as_str(),
        },
    })
}

fn internet_gateway_config(igw: &InternetGateway) -> Value {
    json!({ "vpc": igw.network.as_str() })
}

fn nat_gateway_config(nat: &NatGateway) -> Value {
    json!({
        "subnet": nat.subnet.as_str(),
        "allocation": "elastic-ip",
    })
}

fn policy_config(policy: &FirewallPolicy) -> Value {
    let ingress: Vec<Value> = policy
        .ingress
        .iter()
        .map(|rule| {
            let (from_port, to_port) = match rule.port {
                PortSpec::Tcp(port) => (i32::from(port), i32::from(port)),
                PortSpec::IcmpPing => (i32::from(PortSpec::ICMP_ECHO_TYPE), -1),
            };
            let mut entry = json!({
                "ip_protocol": rule.port.protocol(),
                "from_port": from_port,
                "to_port": to_port,
                "description": rule.description,
            });
            match &rule.source {
                IngressSource::AnyIpv4 => {
                    entry["cidr_ip"] = json!(rule.source.cidr().map(|c| c.to_string()));
                }
                IngressSource::Policy(source) => {
                    entry["source_security_group"] = json!(source.as_str());
                }
            }
            entry
        })
        .collect();

    let egress: Vec<Value> = if policy.allow_all_outbound {
        vec![json!({
            "ip_protocol": "-1",
            "cidr_ip": "0.0.0.0/0",
            "description": "Allow all outbound traffic by default",
        })]
    } else {
        Vec::new()
    };

    json!({
        "group_name": policy.name,
        "group_description": policy.description,
        "vpc": policy.network.as_str(),
        "ingress": ingress,
        "egress": egress,
    })
}

fn instance_config(instance: &ComputeInstance) -> Value {
    json!({
        "instance_type": instance.instance_type.to_string(),
        "image_parameter": instance.image.parameter_path(),
        "subnet": instance.subnet.as_str(),
        "security_groups": [instance.policy.as_str()],
        "key_name": instance.key_name.as_ref().map(|k| k.as_str()),
    })
}

/// Serialized form of a synthesized stack
///
/// Carries no timestamps, so the same graph always serializes to the same
/// bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDocument {
    pub version: u32,
    pub stack: String,
    pub region: Option<String>,
    pub account: Option<String>,

    /// Resources in creation order
    pub resources: Vec<ResourceConfig>,
}

impl StackDocument {
    pub fn new(graph: &ResourceGraph) -> Self {
        let context = graph.context();
        Self {
            version: DOCUMENT_VERSION,
            stack: context.stack_name.clone(),
            region: context.region.clone(),
            account: context.account.clone(),
            resources: synthesize(graph).resources.into_values().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to `<dir>/<stack>.json`, creating `dir` if needed
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}.json", self.stack));
        fs::write(&path, self.to_json()?).await?;

        tracing::debug!("Wrote {} resources to {}", self.resources.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vpcstack_core::{KeyPairName, StackContext, build_topology};

    fn graph(key: Option<&str>) -> ResourceGraph {
        let key = key.map(|k| KeyPairName::new(k).unwrap());
        build_topology(StackContext::default(), key).unwrap().graph
    }

    #[test]
    fn test_synthesize_in_creation_order() {
        let set = synthesize(&graph(Some("my-key")));
        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"cdk-vpc"));
        assert_eq!(ids.last(), Some(&"PrivateInstance"));
        assert_eq!(set.len(), 9);
        let subnets = set.iter().filter(|r| r.resource_type == "subnet").count();
        assert_eq!(subnets, 2);
    }

    #[test]
    fn test_network_config() {
        let set = synthesize(&graph(None));
        let vpc = set.get("network", "cdk-vpc").unwrap();
        assert_eq!(vpc.provider_type, "AWS::EC2::VPC");
        assert_eq!(vpc.config["cidr_block"], "10.0.0.0/16");
        assert!(vpc.depends_on.is_empty());
    }

    #[test]
    fn test_private_policy_references_public_group() {
        let set = synthesize(&graph(None));
        let private = set.get("firewall-policy", "VPC-Priv-SG").unwrap();

        let ingress = private.config["ingress"].as_array().unwrap();
        assert_eq!(ingress.len(), 2);
        for rule in ingress {
            assert_eq!(rule["source_security_group"], "VPC-SG");
            assert!(rule.get("cidr_ip").is_none());
        }
        assert_eq!(ingress[1]["ip_protocol"], "icmp");
        assert_eq!(ingress[1]["from_port"], 8);
        assert_eq!(ingress[1]["to_port"], -1);
        assert_eq!(private.depends_on, vec!["cdk-vpc", "VPC-SG"]);
    }

    #[test]
    fn test_public_policy_rules() {
        let set = synthesize(&graph(None));
        let public = set.get("firewall-policy", "VPC-SG").unwrap();

        let ingress = public.config["ingress"].as_array().unwrap();
        let ports: Vec<i64> = ingress
            .iter()
            .map(|r| r["from_port"].as_i64().unwrap())
            .collect();
        assert_eq!(ports, vec![22, 80, 443]);
        assert!(ingress.iter().all(|r| r["cidr_ip"] == "0.0.0.0/0"));
        assert_eq!(public.config["egress"][0]["ip_protocol"], "-1");
    }

    #[test]
    fn test_instance_config() {
        let set = synthesize(&graph(Some("my-key")));
        let instance = set.get("instance", "PublicInstance").unwrap();
        assert_eq!(instance.config["key_name"], "my-key");
        assert_eq!(
            instance.config["image_parameter"],
            "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2"
        );
        assert_eq!(instance.depends_on, vec!["public-subnet-1-az1", "VPC-SG"]);

        let set = synthesize(&graph(None));
        let instance = set.get("instance", "PrivateInstance").unwrap();
        assert!(instance.config["key_name"].is_null());
    }

    #[test]
    fn test_document_is_reproducible() {
        let first = StackDocument::new(&graph(Some("my-key"))).to_json().unwrap();
        let second = StackDocument::new(&graph(Some("my-key"))).to_json().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_document_write() {
        let temp_dir = tempdir().unwrap();
        let document = StackDocument::new(&graph(Some("my-key")));
        let path = document.write_to(temp_dir.path().join("out")).await.unwrap();

        assert!(path.ends_with("CdkVpcStack.json"));
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: StackDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, document);
        assert_eq!(loaded.stack, "CdkVpcStack");
    }
}
