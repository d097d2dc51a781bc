//! IPv4 and IPv6 CIDR blocks.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    #[error("'{0}' is missing a /prefix")]
    MissingPrefix(String),
    #[error("'{0}' has an invalid address")]
    InvalidAddress(String),
    #[error("'{0}' has an invalid prefix length")]
    InvalidPrefix(String),
}

/// A parsed CIDR block. Host bits are cleared on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cidr {
    V4 { network: u32, prefix: u8 },
    V6 { network: u128, prefix: u8 },
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = text
            .trim()
            .split_once('/')
            .ok_or_else(|| CidrError::MissingPrefix(text.to_string()))?;
        let address: IpAddr = address
            .parse()
            .map_err(|_| CidrError::InvalidAddress(text.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| CidrError::InvalidPrefix(text.to_string()))?;

        match address {
            IpAddr::V4(v4) if prefix <= 32 => Ok(Cidr::V4 {
                network: u32::from(v4) & mask_v4(prefix),
                prefix,
            }),
            IpAddr::V6(v6) if prefix <= 128 => Ok(Cidr::V6 {
                network: u128::from(v6) & mask_v6(prefix),
                prefix,
            }),
            _ => Err(CidrError::InvalidPrefix(text.to_string())),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cidr::V4 { network, prefix } => write!(f, "{}/{}", Ipv4Addr::from(*network), prefix),
            Cidr::V6 { network, prefix } => write!(f, "{}/{}", Ipv6Addr::from(*network), prefix),
        }
    }
}

fn mask_v4(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_v6(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl Cidr {
    pub fn prefix(&self) -> u8 {
        match self {
            Cidr::V4 { prefix, .. } | Cidr::V6 { prefix, .. } => *prefix,
        }
    }

    /// Whether `other` lies entirely inside this block.
    ///
    /// Blocks of different address families never contain each other.
    pub fn contains(&self, other: &Cidr) -> bool {
        match (self, other) {
            (Cidr::V4 { network, prefix }, Cidr::V4 { network: inner, prefix: inner_prefix }) => {
                prefix <= inner_prefix && inner & mask_v4(*prefix) == *network
            }
            (Cidr::V6 { network, prefix }, Cidr::V6 { network: inner, prefix: inner_prefix }) => {
                prefix <= inner_prefix && inner & mask_v6(*prefix) == *network
            }
            _ => false,
        }
    }

    /// Whether the two blocks share any address.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }
}
