//! Compute instances

use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceClass {
    /// Burstable general purpose, previous generation
    T2,
    /// Burstable general purpose
    T3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
}

/// Instance size class, rendered as `<class>.<size>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl Default for InstanceType {
    /// t2.micro, the smallest general-purpose size
    fn default() -> Self {
        Self::of(InstanceClass::T2, InstanceSize::Micro)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            InstanceClass::T2 => "t2",
            InstanceClass::T3 => "t3",
        };
        let size = match self.size {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
        };
        write!(f, "{}.{}", class, size)
    }
}

impl TryFrom<String> for InstanceType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let (class, size) = value
            .split_once('.')
            .ok_or_else(|| format!("invalid instance type: {}", value))?;
        let class = match class {
            "t2" => InstanceClass::T2,
            "t3" => InstanceClass::T3,
            _ => return Err(format!("unknown instance class: {}", class)),
        };
        let size = match size {
            "nano" => InstanceSize::Nano,
            "micro" => InstanceSize::Micro,
            "small" => InstanceSize::Small,
            "medium" => InstanceSize::Medium,
            _ => return Err(format!("unknown instance size: {}", size)),
        };
        Ok(Self { class, size })
    }
}

impl From<InstanceType> for String {
    fn from(value: InstanceType) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    AmazonLinux2,
}

impl OsFamily {
    pub fn is_linux(&self) -> bool {
        match self {
            OsFamily::AmazonLinux2 => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuType {
    X86_64,
    Arm64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageClass {
    /// gp2 EBS
    GeneralPurpose,
    /// Standard EBS
    Ebs,
}

/// Selector for the latest stable image of an OS family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineImage {
    pub os: OsFamily,
    pub cpu: CpuType,
    pub storage: StorageClass,
}

impl MachineImage {
    pub fn latest_amazon_linux(cpu: CpuType, storage: StorageClass) -> Self {
        Self {
            os: OsFamily::AmazonLinux2,
            cpu,
            storage,
        }
    }

    /// Public parameter key the provisioning engine resolves to an image id
    pub fn parameter_path(&self) -> String {
        let os = match self.os {
            OsFamily::AmazonLinux2 => "amzn2",
        };
        let cpu = match self.cpu {
            CpuType::X86_64 => "x86_64",
            CpuType::Arm64 => "arm64",
        };
        let storage = match self.storage {
            StorageClass::GeneralPurpose => "gp2",
            StorageClass::Ebs => "ebs",
        };
        format!(
            "/aws/service/ami-amazon-linux-latest/{}-ami-hvm-{}-{}",
            os, cpu, storage
        )
    }
}

impl Default for MachineImage {
    fn default() -> Self {
        Self::latest_amazon_linux(CpuType::X86_64, StorageClass::GeneralPurpose)
    }
}

/// Name of an SSH key pair registered with the provider
///
/// Existence of the key pair is not checked here; only the shape of the
/// name is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPairName(String);

impl KeyPairName {
    pub const MAX_LEN: usize = 255;

    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GraphError::InvalidKeyPair("name is empty".to_string()));
        }
        if name.chars().count() > Self::MAX_LEN {
            return Err(GraphError::InvalidKeyPair(format!(
                "name exceeds {} characters",
                Self::MAX_LEN
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(GraphError::InvalidKeyPair(format!(
                "{:?} contains control characters",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPairName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for KeyPairName {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<KeyPairName> for String {
    fn from(value: KeyPairName) -> Self {
        value.0
    }
}

/// Virtual machine placed in a subnet and protected by one firewall policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub id: NodeId,
    pub instance_type: InstanceType,
    pub image: MachineImage,
    pub subnet: NodeId,
    pub policy: NodeId,

    /// Unset when no key pair was supplied
    pub key_name: Option<KeyPairName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instance_type() {
        let it = InstanceType::default();
        assert_eq!(it.to_string(), "t2.micro");
        assert_eq!(InstanceType::try_from("t2.micro".to_string()).unwrap(), it);
        assert!(InstanceType::try_from("m5.large".to_string()).is_err());
    }

    #[test]
    fn test_image_parameter_path() {
        let image = MachineImage::default();
        assert!(image.os.is_linux());
        assert_eq!(image.cpu, CpuType::X86_64);
        assert_eq!(image.storage, StorageClass::GeneralPurpose);
        assert_eq!(
            image.parameter_path(),
            "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2"
        );
    }

    #[test]
    fn test_key_pair_name_validation() {
        assert_eq!(KeyPairName::new("my-key").unwrap().as_str(), "my-key");
        assert!(KeyPairName::new("").is_err());
        assert!(KeyPairName::new("   ").is_err());
        assert!(KeyPairName::new("bad\nkey").is_err());
        assert!(KeyPairName::new("k".repeat(256)).is_err());
        assert!(KeyPairName::new("k".repeat(255)).is_ok());
    }

    #[test]
    fn test_key_pair_name_deserialize_rejects_empty() {
        let result: std::result::Result<KeyPairName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
