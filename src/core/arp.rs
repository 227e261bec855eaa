//! Hardware address resolution.
//!
//! The transmit pipeline asks a `Resolver` for the Ethernet address of each
//! destination, one request at a time. Caching, retries and timeouts are the
//! resolver's business; every request must eventually be answered with either
//! an address or a failure.

use std::collections::HashMap;
use std::time::{
    Duration,
    Instant,
};

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::core::time::{
    Clock,
    SystemClock,
};
use crate::{
    Error,
    Result,
};

/// Answer to an address resolution request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(EthernetAddress),
    Failed,
}

/// The request/response contract of an address resolution engine.
pub trait Resolver {
    /// Submits a request for the Ethernet address of an IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if the resolver can not accept a request right
    /// now, for example because a previous request is still outstanding.
    fn request(&mut self, ipv4_addr: Ipv4Address) -> Result<()>;

    /// Returns the response to the outstanding request once it is available,
    /// completing the exchange.
    fn response(&mut self) -> Option<Resolution>;
}

#[derive(Debug)]
struct Entry {
    eth_addr: EthernetAddress,
    in_cache_since: Instant,
}

/// Resolves addresses from an expiring set of IPv4 -> Ethernet address
/// mappings.
///
/// A request for an address without a mapping fails straight away.
#[derive(Debug)]
pub struct ArpTable<C = SystemClock>
where
    C: Clock,
{
    entries: HashMap<Ipv4Address, Entry>,
    expiration: Duration,
    in_cache_since_min: Instant,
    clock: C,
    pending: Option<Ipv4Address>,
}

impl<C: Clock> ArpTable<C> {
    /// Creates an ARP table where Ethernet address mappings expire after
    /// expiration_in_secs seconds.
    pub fn new(expiration_in_secs: u64, clock: C) -> ArpTable<C> {
        ArpTable {
            entries: HashMap::new(),
            expiration: Duration::from_secs(expiration_in_secs),
            in_cache_since_min: clock.now(),
            clock,
            pending: None,
        }
    }

    /// Lookup the Ethernet address for an IPv4 address.
    pub fn eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        if ipv4_addr == Ipv4Address::new([255; 4]) {
            return Some(EthernetAddress::BROADCAST);
        }

        self.expire_eth_addr();
        self.entries.get(&ipv4_addr).map(|entry| entry.eth_addr)
    }

    /// Create or update the Ethernet address mapping for an IPv4 address.
    pub fn set_eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) {
        self.expire_eth_addr();

        let in_cache_since = self.clock.now();

        if self.entries.is_empty() {
            self.in_cache_since_min = in_cache_since;
        }

        self.entries.insert(
            ipv4_addr,
            Entry {
                eth_addr,
                in_cache_since,
            },
        );
    }

    /// Returns the clock driving expiration.
    pub fn clock(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Purge Ethernet address entries translations that have expired.
    fn expire_eth_addr(&mut self) {
        let now = self.clock.now();

        if now > self.in_cache_since_min + self.expiration {
            let expiration = self.expiration;
            self.entries
                .retain(|_, entry| now.duration_since(entry.in_cache_since) <= expiration);

            let in_cache_since = self.entries.values().map(|entry| entry.in_cache_since);
            self.in_cache_since_min = in_cache_since.min().unwrap_or(now);
        }
    }
}

impl<C: Clock> Resolver for ArpTable<C> {
    fn request(&mut self, ipv4_addr: Ipv4Address) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::Exhausted);
        }

        self.pending = Some(ipv4_addr);
        Ok(())
    }

    fn response(&mut self) -> Option<Resolution> {
        let ipv4_addr = self.pending.take()?;

        match self.eth_addr_for_ip(ipv4_addr) {
            Some(eth_addr) => Some(Resolution::Resolved(eth_addr)),
            None => {
                debug!("No Ethernet address for {}.", ipv4_addr);
                Some(Resolution::Failed)
            }
        }
    }
}
