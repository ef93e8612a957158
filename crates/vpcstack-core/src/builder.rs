//! Topology builder
//!
//! Declares the two-tier topology one resource at a time. Each `define_*`
//! call registers the resource and its dependency edges and hands back the
//! record, which later calls take as input. The private firewall policy
//! needs the public policy's record, so it cannot be declared first.

use crate::error::{GraphError, Result};
use crate::graph::{EdgeKind, GraphBuilder, NodeId, Resource, ResourceGraph};
use crate::model::{
    ComputeInstance, DefaultRoute, FirewallPolicy, IngressRule, InstanceType, InternetGateway,
    Ipv4Cidr, KeyPairName, MachineImage, NatGateway, Network, PortSpec, StackContext, Subnet,
    SubnetAllocator, SubnetConfiguration, SubnetKind,
};
use std::net::Ipv4Addr;

pub const NETWORK_ID: &str = "cdk-vpc";
pub const PUBLIC_POLICY_ID: &str = "VPC-SG";
pub const PRIVATE_POLICY_ID: &str = "VPC-Priv-SG";
pub const PUBLIC_INSTANCE_ID: &str = "PublicInstance";
pub const PRIVATE_INSTANCE_ID: &str = "PrivateInstance";

/// The network declared by [`TopologyBuilder::define_network`]
///
/// `10.0.0.0/16` in one availability zone with one NAT gateway. The
/// private group is listed first and therefore gets the first `/24`.
pub fn default_network() -> Result<Network> {
    Ok(Network {
        id: NodeId::new(NETWORK_ID),
        cidr: Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 16)?,
        max_azs: 1,
        nat_gateways: 1,
        subnet_configuration: vec![
            SubnetConfiguration::new("private-subnet-1", SubnetKind::PrivateWithNat, 24),
            SubnetConfiguration::new("public-subnet-1", SubnetKind::Public, 24),
        ],
    })
}

/// Builds the desired-state graph
pub struct TopologyBuilder {
    graph: GraphBuilder,
}

impl TopologyBuilder {
    pub fn new(context: StackContext) -> Self {
        Self {
            graph: GraphBuilder::new(context),
        }
    }

    /// Declare the default network and its subnets
    pub fn define_network(&mut self) -> Result<(Network, Vec<Subnet>)> {
        let network = default_network()?;
        let subnets = self.define_network_with(network.clone())?;
        Ok((network, subnets))
    }

    /// Declare `network`, expanding its subnet groups over its availability
    /// zones, plus the gateways the subnet tiers need.
    ///
    /// Returns the subnets in allocation order (group-major, then zone).
    pub fn define_network_with(&mut self, network: Network) -> Result<Vec<Subnet>> {
        if network.max_azs == 0 {
            return Err(GraphError::InvalidNetwork(
                "max_azs must be at least 1".to_string(),
            ));
        }

        let has_public = network
            .subnet_configuration
            .iter()
            .any(|c| c.kind.is_public());
        let has_private = network
            .subnet_configuration
            .iter()
            .any(|c| !c.kind.is_public());

        if has_private && network.nat_gateways == 0 {
            return Err(GraphError::InvalidNetwork(
                "private-with-nat subnets need at least one NAT gateway".to_string(),
            ));
        }
        if network.nat_gateways > 0 && !has_public {
            return Err(GraphError::InvalidNetwork(
                "NAT gateways need a public subnet".to_string(),
            ));
        }

        // NAT gateways live in public subnets, one per zone at most
        let nat_count = network.nat_gateways.min(network.max_azs);
        let igw_id = NodeId::new(format!("{}-igw", network.id));
        let nat_ids: Vec<NodeId> = (1..=nat_count)
            .map(|i| NodeId::new(format!("{}-nat{}", network.id, i)))
            .collect();

        self.graph.add_node(Resource::Network(network.clone()))?;
        tracing::debug!("Declared network {} ({})", network.id, network.cidr);

        let mut allocator = SubnetAllocator::new(network.cidr);
        let mut subnets = Vec::new();
        for config in &network.subnet_configuration {
            for az in 0..network.max_azs {
                let cidr = allocator.allocate(config.cidr_mask)?;
                let route = match config.kind {
                    SubnetKind::Public => DefaultRoute::InternetGateway(igw_id.clone()),
                    SubnetKind::PrivateWithNat => {
                        let nat = (az % nat_count) as usize;
                        DefaultRoute::NatGateway(nat_ids[nat].clone())
                    }
                };
                let subnet = Subnet {
                    id: NodeId::new(format!("{}-az{}", config.name, az + 1)),
                    name: config.name.clone(),
                    kind: config.kind,
                    cidr,
                    network: network.id.clone(),
                    availability_zone_index: az,
                    map_public_ip_on_launch: config.kind.is_public(),
                    route,
                };
                self.graph.add_node(Resource::Subnet(subnet.clone()))?;
                self.graph
                    .add_edge(&network.id, &subnet.id, EdgeKind::Owns)?;
                tracing::debug!("Declared {} subnet {} ({})", subnet.kind, subnet.id, cidr);
                subnets.push(subnet);
            }
        }

        if has_public {
            let igw = InternetGateway {
                id: igw_id.clone(),
                network: network.id.clone(),
            };
            self.graph.add_node(Resource::InternetGateway(igw))?;
            self.graph.add_edge(&network.id, &igw_id, EdgeKind::Owns)?;
            tracing::debug!("Declared internet gateway {}", igw_id);
        }

        let public_subnets: Vec<&Subnet> = subnets.iter().filter(|s| s.kind.is_public()).collect();
        for (i, nat_id) in nat_ids.iter().enumerate() {
            let host = public_subnets
                .iter()
                .find(|s| s.availability_zone_index as usize == i)
                .or_else(|| public_subnets.first())
                .ok_or_else(|| GraphError::InvalidNetwork("no public subnet".to_string()))?;
            let nat = NatGateway {
                id: nat_id.clone(),
                subnet: host.id.clone(),
            };
            self.graph.add_node(Resource::NatGateway(nat))?;
            self.graph.add_edge(&host.id, nat_id, EdgeKind::Owns)?;
            tracing::debug!("Declared NAT gateway {} in {}", nat_id, host.id);
        }

        for subnet in &subnets {
            self.graph
                .add_edge(subnet.route.target(), &subnet.id, EdgeKind::RoutesVia)?;
        }

        Ok(subnets)
    }

    /// Public-facing policy: SSH, HTTP and HTTPS from anywhere
    pub fn define_public_firewall_policy(&mut self, network: &Network) -> Result<FirewallPolicy> {
        let policy = FirewallPolicy {
            id: NodeId::new(PUBLIC_POLICY_ID),
            name: "CDK-VPC-SG".to_string(),
            description: "Custom CDK VPC SG, allow SSH/http".to_string(),
            allow_all_outbound: true,
            network: network.id.clone(),
            ingress: vec![
                IngressRule::from_any_ipv4(PortSpec::Tcp(22)),
                IngressRule::from_any_ipv4(PortSpec::Tcp(80)),
                IngressRule::from_any_ipv4(PortSpec::Tcp(443)),
            ],
        };
        self.declare_policy(network, &policy)?;
        Ok(policy)
    }

    /// Internal policy: SSH and ping, only from members of `public`
    pub fn define_private_firewall_policy(
        &mut self,
        network: &Network,
        public: &FirewallPolicy,
    ) -> Result<FirewallPolicy> {
        let policy = FirewallPolicy {
            id: NodeId::new(PRIVATE_POLICY_ID),
            name: "CDK-VPC-Priv-SG".to_string(),
            description: "Custom CDK VPC Private SG, allow internal SSH".to_string(),
            allow_all_outbound: true,
            network: network.id.clone(),
            ingress: vec![
                IngressRule::from_policy(public, PortSpec::Tcp(22)),
                IngressRule::from_policy(public, PortSpec::IcmpPing),
            ],
        };
        self.declare_policy(network, &policy)?;
        Ok(policy)
    }

    fn declare_policy(&mut self, network: &Network, policy: &FirewallPolicy) -> Result<()> {
        self.graph
            .add_node(Resource::FirewallPolicy(policy.clone()))?;
        self.graph
            .add_edge(&network.id, &policy.id, EdgeKind::Owns)?;
        for source in policy.source_policies() {
            self.graph.add_edge(source, &policy.id, EdgeKind::Permits)?;
        }
        tracing::debug!(
            "Declared firewall policy {} with {} ingress rules",
            policy.name,
            policy.ingress.len()
        );
        Ok(())
    }

    /// Smallest general-purpose instance running the latest Amazon Linux 2
    /// (x86_64, gp2), placed in `subnet` and protected by `policy`.
    ///
    /// A missing key pair leaves the key unset; rejecting it is up to
    /// validation or to the provisioning engine.
    pub fn define_instance(
        &mut self,
        id: &str,
        subnet: &Subnet,
        policy: &FirewallPolicy,
        key_name: Option<&KeyPairName>,
    ) -> Result<ComputeInstance> {
        let instance = ComputeInstance {
            id: NodeId::new(id),
            instance_type: InstanceType::default(),
            image: MachineImage::default(),
            subnet: subnet.id.clone(),
            policy: policy.id.clone(),
            key_name: key_name.cloned(),
        };

        self.graph.add_node(Resource::Instance(instance.clone()))?;
        self.graph
            .add_edge(&subnet.id, &instance.id, EdgeKind::PlacedIn)?;
        self.graph
            .add_edge(&policy.id, &instance.id, EdgeKind::ProtectedBy)?;

        if instance.key_name.is_none() {
            tracing::debug!("Instance {} declared without a key pair", instance.id);
        }
        tracing::debug!(
            "Declared instance {} ({}) in {} with {}",
            instance.id,
            instance.instance_type,
            subnet.id,
            policy.name
        );
        Ok(instance)
    }

    pub fn finish(self) -> Result<ResourceGraph> {
        self.graph.freeze()
    }
}

/// Typed handles to the declared resources plus the frozen graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub network: Network,
    pub public_subnet: Subnet,
    pub private_subnet: Subnet,
    pub public_policy: FirewallPolicy,
    pub private_policy: FirewallPolicy,
    pub public_instance: ComputeInstance,
    pub private_instance: ComputeInstance,
    pub graph: ResourceGraph,
}

/// Declare the whole two-tier topology in dependency order
pub fn build_topology(context: StackContext, key_name: Option<KeyPairName>) -> Result<Topology> {
    tracing::debug!("Building topology for stack {}", context.stack_name);
    let mut builder = TopologyBuilder::new(context);

    let (network, subnets) = builder.define_network()?;
    let public_subnet = first_of_kind(&subnets, SubnetKind::Public)?;
    let private_subnet = first_of_kind(&subnets, SubnetKind::PrivateWithNat)?;

    let public_policy = builder.define_public_firewall_policy(&network)?;
    let private_policy = builder.define_private_firewall_policy(&network, &public_policy)?;

    let public_instance = builder.define_instance(
        PUBLIC_INSTANCE_ID,
        &public_subnet,
        &public_policy,
        key_name.as_ref(),
    )?;
    let private_instance = builder.define_instance(
        PRIVATE_INSTANCE_ID,
        &private_subnet,
        &private_policy,
        key_name.as_ref(),
    )?;

    let graph = builder.finish()?;
    tracing::debug!("Topology has {} resources", graph.len());

    Ok(Topology {
        network,
        public_subnet,
        private_subnet,
        public_policy,
        private_policy,
        public_instance,
        private_instance,
        graph,
    })
}

fn first_of_kind(subnets: &[Subnet], kind: SubnetKind) -> Result<Subnet> {
    subnets
        .iter()
        .find(|s| s.kind == kind)
        .cloned()
        .ok_or_else(|| GraphError::InvalidNetwork(format!("no {} subnet", kind)))
}
