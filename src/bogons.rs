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
//! Sets of IP prefixes, loaded from bogon lists or RouteViews `pfx2as` files.
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    net::IpAddr,
    path::{Path, PathBuf},
};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

#[derive(Debug, thiserror::Error)]
pub enum BogonError {
    #[error("Cannot read prefix list {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A set of IPv4 and IPv6 prefixes, kept in two separate tables. All prefixes are stored with
/// their host bits cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSet {
    v4: HashSet<Ipv4Net>,
    v6: HashSet<Ipv6Net>,
}

impl PrefixSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, net: IpNet) -> bool {
        match net.trunc() {
            IpNet::V4(net) => self.v4.insert(net),
            IpNet::V6(net) => self.v6.insert(net),
        }
    }

    /// Check if exactly this prefix is in the set.
    pub fn contains(&self, net: &IpNet) -> bool {
        match net.trunc() {
            IpNet::V4(net) => self.v4.contains(&net),
            IpNet::V6(net) => self.v6.contains(&net),
        }
    }

    /// Check if the prefix, or any of its supernets, is in the set.
    pub fn covers(&self, net: &IpNet) -> bool {
        match net.trunc() {
            IpNet::V4(net) => {
                let mut cur = Some(net);
                while let Some(n) = cur {
                    if self.v4.contains(&n) {
                        return true;
                    }
                    cur = n.supernet();
                }
                false
            }
            IpNet::V6(net) => {
                let mut cur = Some(net);
                while let Some(n) = cur {
                    if self.v6.contains(&n) {
                        return true;
                    }
                    cur = n.supernet();
                }
                false
            }
        }
    }

    pub fn len_v4(&self) -> usize {
        self.v4.len()
    }

    pub fn len_v6(&self) -> usize {
        self.v6.len()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    /// Read a bogon list with one CIDR prefix per line, as published by Team Cymru. Empty lines and
    /// lines starting with `#` are ignored. If a line contains multiple fields (separated by
    /// whitespace or commas), only the first one is considered.
    pub fn read_bogons<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut set = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let field = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .next()
                .unwrap_or_default();
            match field.parse::<IpNet>() {
                Ok(net) => {
                    set.insert(net);
                }
                Err(e) => log::warn!("Skipping line {} of the bogon list ({line:?}): {e}", i + 1),
            }
        }
        Ok(set)
    }

    /// Read a RouteViews `pfx2as` file, where each line has the form `<ip> <prefix-len> <asn>`.
    /// Malformed lines are skipped.
    pub fn read_pfx2as<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut set = Self::new();
        let mut skipped = 0usize;
        for line in reader.lines() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let (Some(ip), Some(len)) = (fields.next(), fields.next()) else {
                skipped += 1;
                continue;
            };
            let Some(net) = ip
                .parse::<IpAddr>()
                .ok()
                .zip(len.parse::<u8>().ok())
                .and_then(|(ip, len)| IpNet::new(ip, len).ok())
            else {
                skipped += 1;
                continue;
            };
            set.insert(net);
        }
        if skipped > 0 {
            log::debug!("Skipped {skipped} malformed pfx2as lines");
        }
        Ok(set)
    }

    pub fn load_bogons(path: impl AsRef<Path>) -> Result<Self, BogonError> {
        let path = path.as_ref();
        let set = open(path).and_then(Self::read_bogons).map_err(|source| BogonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Loaded {} IPv4 and {} IPv6 bogons from {path:?}",
            set.len_v4(),
            set.len_v6()
        );
        Ok(set)
    }

    pub fn load_pfx2as(path: impl AsRef<Path>) -> Result<Self, BogonError> {
        let path = path.as_ref();
        let set = open(path).and_then(Self::read_pfx2as).map_err(|source| BogonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Loaded {} IPv4 and {} IPv6 announced prefixes from {path:?}",
            set.len_v4(),
            set.len_v6()
        );
        Ok(set)
    }

    /// Load and join several files of the same kind.
    pub fn load_all<P, F>(paths: impl IntoIterator<Item = P>, load: F) -> Result<Self, BogonError>
    where
        P: AsRef<Path>,
        F: Fn(P) -> Result<Self, BogonError>,
    {
        let mut set = Self::new();
        for path in paths {
            set.extend_from(load(path)?);
        }
        Ok(set)
    }

    pub fn extend_from(&mut self, other: PrefixSet) {
        self.v4.extend(other.v4);
        self.v6.extend(other.v6);
    }
}

impl Extend<IpNet> for PrefixSet {
    fn extend<T: IntoIterator<Item = IpNet>>(&mut self, iter: T) {
        iter.into_iter().for_each(|net| {
            self.insert(net);
        });
    }
}

impl FromIterator<IpNet> for PrefixSet {
    fn from_iter<T: IntoIterator<Item = IpNet>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

fn open(path: &Path) -> std::io::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}
