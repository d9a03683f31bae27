// ASLINKS: Extraction of Undirected AS Links from BGP Routing Table Dumps
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Decides whether an announced prefix is globally routable.
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::bogons::PrefixSet;

/// Shortest IPv4 prefix that is accepted.
pub const MIN_V4_PREFIX_LEN: u8 = 8;
/// Longest IPv4 prefix that is accepted.
pub const MAX_V4_PREFIX_LEN: u8 = 24;
/// Longest IPv6 prefix that is accepted.
pub const MAX_V6_PREFIX_LEN: u8 = 64;

/// How a prefix is looked up in the bogon list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum BogonMatch {
    /// Only reject a prefix if it is listed itself.
    #[default]
    Exact,
    /// Reject a prefix if it or any of its supernets is listed.
    Covering,
}

/// Outcome of checking a single prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixVerdict {
    Valid(IpNet),
    Unparsable,
    Bogon,
    MaskLength,
    /// An allow-list is configured and the prefix is not on it.
    NotAnnounced,
}

impl PrefixVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Check the mask length policy: IPv4 between /8 and /24, IPv6 up to /64.
pub fn mask_length_ok(net: &IpNet) -> bool {
    match net {
        IpNet::V4(net) => (MIN_V4_PREFIX_LEN..=MAX_V4_PREFIX_LEN).contains(&net.prefix_len()),
        IpNet::V6(net) => net.prefix_len() <= MAX_V6_PREFIX_LEN,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrefixFilter {
    bogons: PrefixSet,
    mode: BogonMatch,
    allow_list: Option<PrefixSet>,
}

impl PrefixFilter {
    /// Create a filter from the bogon list. The bogon list holds both the IPv4 and IPv6 bogons.
    pub fn new(bogons: PrefixSet) -> Self {
        Self {
            bogons,
            mode: BogonMatch::Exact,
            allow_list: None,
        }
    }

    pub fn with_mode(mut self, mode: BogonMatch) -> Self {
        self.mode = mode;
        self
    }

    /// Only accept prefixes that are also present in `allow_list`.
    pub fn with_allow_list(mut self, allow_list: PrefixSet) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Parse and check a prefix in CIDR notation.
    pub fn check(&self, prefix: &str) -> PrefixVerdict {
        match prefix.trim().parse::<IpNet>() {
            Ok(net) => self.check_net(net),
            Err(_) => PrefixVerdict::Unparsable,
        }
    }

    pub fn check_net(&self, net: IpNet) -> PrefixVerdict {
        let net = net.trunc();
        let is_bogon = match self.mode {
            BogonMatch::Exact => self.bogons.contains(&net),
            BogonMatch::Covering => self.bogons.covers(&net),
        };
        if is_bogon {
            PrefixVerdict::Bogon
        } else if !mask_length_ok(&net) {
            PrefixVerdict::MaskLength
        } else if self
            .allow_list
            .as_ref()
            .is_some_and(|allowed| !allowed.contains(&net))
        {
            PrefixVerdict::NotAnnounced
        } else {
            PrefixVerdict::Valid(net)
        }
    }

    pub fn is_valid(&self, prefix: &str) -> bool {
        self.check(prefix).is_valid()
    }
}
