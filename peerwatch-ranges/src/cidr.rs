//! IPv4 CIDR blocks.
//!
//! Addresses are held in MSB-first `u32` form (the same representation as
//! `u32::from(Ipv4Addr)`), so masking works with plain shifts.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// Errors from CIDR parsing and splitting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid CIDR: {0}")]
    Invalid(String),

    #[error("prefix length must be at most 32, got {0}")]
    PrefixTooLong(u8),

    #[error("cannot split /{from} into /{to} subnets")]
    InvalidSubnetPrefix { from: u8, to: u8 },
}

/// An IPv4 network block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cidr {
    network: u32,
    prefix_len: u8,
}

fn mask_for(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - u32::from(prefix_len))
    }
}

impl Cidr {
    /// Create a block from any address inside it; host bits are cleared.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, CidrError> {
        if prefix_len > 32 {
            return Err(CidrError::PrefixTooLong(prefix_len));
        }
        Ok(Self {
            network: u32::from(addr) & mask_for(prefix_len),
            prefix_len,
        })
    }

    /// Network address of the block.
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses covered by the block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    /// Check whether `addr` falls inside the block.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (u32::from(addr) & mask_for(self.prefix_len)) == self.network
    }

    /// Split the block into consecutive subnets of `new_prefix`, in ascending order.
    ///
    /// Splitting into the block's own prefix returns the block itself.
    pub fn subnets(&self, new_prefix: u8) -> Result<Vec<Cidr>, CidrError> {
        if new_prefix < self.prefix_len || new_prefix > 32 {
            return Err(CidrError::InvalidSubnetPrefix {
                from: self.prefix_len,
                to: new_prefix,
            });
        }

        let count = 1u64 << u32::from(new_prefix - self.prefix_len);
        let step = 1u64 << (32 - u32::from(new_prefix));
        let base = u64::from(self.network);

        Ok((0..count)
            .map(|i| Cidr {
                network: (base + i * step) as u32,
                prefix_len: new_prefix,
            })
            .collect())
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    /// Parse `a.b.c.d/n`. A bare address parses as a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| CidrError::Invalid(s.to_string()))?;
        let prefix_len = match prefix_part {
            Some(p) => p.parse::<u8>().map_err(|_| CidrError::Invalid(s.to_string()))?,
            None => 32,
        };

        Cidr::new(addr, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}
