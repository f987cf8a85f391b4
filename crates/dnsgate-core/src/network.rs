//! CIDR network parsing and membership.
//!
//! A [`Network`] is built once per run from the provisioned network block and
//! answers a single question: does this address belong to the block?

use serde::{Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Errors from CIDR parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Malformed network '{input}': {reason}")]
    Malformed { input: String, reason: String },
}

impl NetworkError {
    fn malformed(input: &str, reason: impl Into<String>) -> Self {
        NetworkError::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// An IP network in CIDR form.
///
/// The base address is stored with host bits cleared, so `10.0.5.1/16`
/// and `10.0.0.0/16` are the same network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    base: IpAddr,
    prefix_len: u8,
}

impl Network {
    /// Parse a CIDR string such as `10.0.0.0/16` or `fd00::/8`.
    pub fn parse(cidr: &str) -> Result<Self, NetworkError> {
        let (addr, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::malformed(cidr, "missing '/' prefix separator"))?;

        let base: IpAddr = addr
            .parse()
            .map_err(|_| NetworkError::malformed(cidr, format!("invalid address '{}'", addr)))?;

        if prefix.is_empty() || prefix.len() > 3 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NetworkError::malformed(
                cidr,
                format!("invalid prefix length '{}'", prefix),
            ));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| NetworkError::malformed(cidr, format!("invalid prefix length '{}'", prefix)))?;

        let max = max_prefix(&base);
        if prefix_len > max {
            return Err(NetworkError::malformed(
                cidr,
                format!("prefix length {} exceeds {}", prefix_len, max),
            ));
        }

        Ok(Self {
            base: mask_addr(base, prefix_len),
            prefix_len,
        })
    }

    /// Network base address (host bits cleared).
    pub fn base(&self) -> IpAddr {
        self.base
    }

    /// Prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn is_ipv4(&self) -> bool {
        self.base.is_ipv4()
    }

    /// Whether `ip` falls inside this network.
    ///
    /// Addresses of the other family are never members.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.base, ip) {
            (IpAddr::V4(base), IpAddr::V4(candidate)) => {
                let mask = v4_mask(self.prefix_len);
                u32::from(candidate) & mask == u32::from(base) & mask
            }
            (IpAddr::V6(base), IpAddr::V6(candidate)) => {
                let mask = v6_mask(self.prefix_len);
                u128::from(candidate) & mask == u128::from(base) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

impl Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n)),
    }
}

fn mask_addr(addr: IpAddr, prefix_len: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix_len))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix_len))),
    }
}
