//! IPv4 CIDR blocks

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 address block in CIDR notation (e.g. `10.0.0.0/16`)
///
/// The address is always the network address: host bits are rejected on
/// parse, so two blocks compare equal only if they cover the same range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// The block matching every IPv4 address
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(GraphError::InvalidCidr(format!("{}/{}", address, prefix)));
        }
        if u32::from(address) & !mask(prefix) != 0 {
            return Err(GraphError::InvalidCidr(format!(
                "{}/{} has host bits set",
                address, prefix
            )));
        }
        Ok(Self { address, prefix })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses covered by the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.address) & mask(self.prefix) == u32::from(self.address)
    }

    /// Carve the `index`-th block of length `prefix` out of this one.
    ///
    /// Blocks are numbered from the start of the range, so `10.0.0.0/16`
    /// yields `10.0.0.0/24` for index 0 and `10.0.1.0/24` for index 1.
    pub fn subnet(&self, prefix: u8, index: u32) -> Result<Ipv4Cidr> {
        if prefix < self.prefix || prefix > 32 {
            return Err(GraphError::InvalidCidr(format!(
                "/{} cannot be carved from {}",
                prefix, self
            )));
        }

        let count = 1u64 << u32::from(prefix - self.prefix);
        if u64::from(index) >= count {
            return Err(GraphError::SubnetExhausted {
                network: self.to_string(),
                prefix,
                index,
            });
        }

        let step = 1u64 << (32 - u32::from(prefix));
        let start = u64::from(u32::from(self.address)) + u64::from(index) * step;
        // start < 2^32 because index < count
        Ipv4Cidr::new(Ipv4Addr::from(start as u32), prefix)
    }
}

/// Hands out consecutive, non-overlapping blocks of a parent block
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    block: Ipv4Cidr,
    next: u64,
}

impl SubnetAllocator {
    pub fn new(block: Ipv4Cidr) -> Self {
        Self { block, next: 0 }
    }

    /// Next free block of length `prefix`, aligned to its own size
    pub fn allocate(&mut self, prefix: u8) -> Result<Ipv4Cidr> {
        if prefix < self.block.prefix || prefix > 32 {
            return Err(GraphError::InvalidCidr(format!(
                "/{} cannot be carved from {}",
                prefix, self.block
            )));
        }

        let size = 1u64 << (32 - u32::from(prefix));
        let offset = self.next.div_ceil(size) * size;
        let index = u32::try_from(offset / size).map_err(|_| GraphError::SubnetExhausted {
            network: self.block.to_string(),
            prefix,
            index: u32::MAX,
        })?;

        let cidr = self.block.subnet(prefix, index)?;
        self.next = offset + size;
        Ok(cidr)
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| GraphError::InvalidCidr(s.to_string()))?;
        let address =
            Ipv4Addr::from_str(addr).map_err(|_| GraphError::InvalidCidr(s.to_string()))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| GraphError::InvalidCidr(s.to_string()))?;
        Ipv4Cidr::new(address, prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(cidr.address(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
        assert_eq!(cidr.size(), 65536);
    }

    #[test]
    fn test_reject_host_bits() {
        assert!("10.0.0.1/16".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn test_reject_malformed() {
        assert!("10.0.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0/16".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/x".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn test_any() {
        assert_eq!(Ipv4Cidr::ANY.to_string(), "0.0.0.0/0");
        assert_eq!("0.0.0.0/0".parse::<Ipv4Cidr>().unwrap(), Ipv4Cidr::ANY);
    }

    #[test]
    fn test_subnet_carving() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(vpc.subnet(24, 0).unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(vpc.subnet(24, 1).unwrap().to_string(), "10.0.1.0/24");
        assert_eq!(vpc.subnet(24, 255).unwrap().to_string(), "10.0.255.0/24");
        assert!(matches!(
            vpc.subnet(24, 256),
            Err(GraphError::SubnetExhausted { .. })
        ));
        assert!(vpc.subnet(8, 0).is_err());
    }

    #[test]
    fn test_allocator_sequential_and_aligned() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let mut alloc = SubnetAllocator::new(vpc);
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.1.0/24");
        // a /23 must start on an even /24 boundary
        assert_eq!(alloc.allocate(23).unwrap().to_string(), "10.0.2.0/23");
        assert_eq!(alloc.allocate(28).unwrap().to_string(), "10.0.4.0/28");
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.5.0/24");
    }

    #[test]
    fn test_allocator_exhaustion() {
        let block: Ipv4Cidr = "10.0.0.0/23".parse().unwrap();
        let mut alloc = SubnetAllocator::new(block);
        alloc.allocate(24).unwrap();
        alloc.allocate(24).unwrap();
        assert!(matches!(
            alloc.allocate(24),
            Err(GraphError::SubnetExhausted { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let inside: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
        let outside: Ipv4Cidr = "10.1.0.0/24".parse().unwrap();
        assert!(vpc.contains(&inside));
        assert!(!vpc.contains(&outside));
        assert!(Ipv4Cidr::ANY.contains(&vpc));
    }

    #[test]
    fn test_serde_as_string() {
        let cidr: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"10.0.1.0/24\"");
        let back: Ipv4Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr);
    }
}
