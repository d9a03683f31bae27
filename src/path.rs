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
//! Canonicalization of raw AS paths.
//!
//! A raw AS path as it appears in a RIB dump (e.g., `"3333 1299 1299 13335"`) is turned into a
//! [`CanonicalPath`] by removing AS-path prepending and rejecting paths that contain a cycle or
//! that are too short to contain a single link.

use std::{collections::HashSet, fmt, str::FromStr};

use itertools::Itertools;

use crate::{links::AsLink, Asn};

/// Reasons for rejecting an AS path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path contains a token that is not a plain ASN, e.g., an AS set `{1,2}`.
    #[error("Invalid AS path token: {0:?}")]
    InvalidToken(String),
    /// Some ASN appears twice after removing prepending.
    #[error("The AS path contains a cycle")]
    Cycle,
    /// Fewer than two ASes remain after removing prepending.
    #[error("The AS path has fewer than two distinct hops")]
    TooShort,
}

/// Split a whitespace-separated AS path into its ASNs.
pub fn parse_as_path(as_path: &str) -> Result<Vec<Asn>, PathError> {
    as_path
        .split_whitespace()
        .map(|token| {
            token
                .parse::<Asn>()
                .map_err(|_| PathError::InvalidToken(token.to_string()))
        })
        .collect()
}

/// Remove AS-path prepending, i.e., keep an element only if it differs from its predecessor.
pub fn remove_prepending(seq: &[Asn]) -> Vec<Asn> {
    seq.iter().copied().dedup().collect()
}

/// Check whether any ASN appears more than once anywhere in the sequence.
pub fn has_cycle(seq: &[Asn]) -> bool {
    let mut seen = HashSet::with_capacity(seq.len());
    !seq.iter().all(|asn| seen.insert(*asn))
}

/// An AS path without prepending, without cycles, and with at least two ASes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPath(Vec<Asn>);

impl CanonicalPath {
    /// Canonicalize an already parsed sequence of ASNs.
    pub fn new(seq: Vec<Asn>) -> Result<Self, PathError> {
        let seq = remove_prepending(&seq);
        if has_cycle(&seq) {
            return Err(PathError::Cycle);
        }
        if seq.len() < 2 {
            return Err(PathError::TooShort);
        }
        Ok(Self(seq))
    }

    /// The ASNs of the path, from the collector peer towards the origin.
    pub fn asns(&self) -> &[Asn] {
        &self.0
    }

    /// Number of ASes on the path. Always at least 2.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A canonical path is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the undirected links between every two consecutive ASes.
    pub fn links(&self) -> impl Iterator<Item = AsLink> + '_ {
        self.0
            .iter()
            .tuple_windows()
            .map(|(a, b)| AsLink::new(*a, *b))
    }
}

impl FromStr for CanonicalPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_as_path(s)?)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}

impl From<CanonicalPath> for Vec<Asn> {
    fn from(path: CanonicalPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prepending_is_removed() {
        let path: CanonicalPath = "1 2 2 3".parse().unwrap();
        assert_eq!(path.asns(), &[1, 2, 3]);
        assert_eq!(path.to_string(), "1 2 3");

        let path: CanonicalPath = "3333 3333 3333 1299 13335 13335".parse().unwrap();
        assert_eq!(path.asns(), &[3333, 1299, 13335]);
    }

    #[test]
    fn cycle_is_rejected() {
        assert_eq!("1 2 1".parse::<CanonicalPath>(), Err(PathError::Cycle));
        assert_eq!("1 2 2 3 2".parse::<CanonicalPath>(), Err(PathError::Cycle));
        // prepending alone is not a cycle
        assert!("1 1 1 2".parse::<CanonicalPath>().is_ok());
    }

    #[test]
    fn short_paths_are_rejected() {
        assert_eq!("1".parse::<CanonicalPath>(), Err(PathError::TooShort));
        assert_eq!("7 7 7".parse::<CanonicalPath>(), Err(PathError::TooShort));
        assert_eq!("".parse::<CanonicalPath>(), Err(PathError::TooShort));
    }

    #[test]
    fn as_sets_are_rejected() {
        assert_eq!(
            "1 2 {3,4}".parse::<CanonicalPath>(),
            Err(PathError::InvalidToken("{3,4}".to_string()))
        );
        assert!(matches!(
            parse_as_path("1 -2"),
            Err(PathError::InvalidToken(_))
        ));
    }

    #[test]
    fn whitespace_is_flexible() {
        assert_eq!(parse_as_path("  1\t2   3 ").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn helpers() {
        assert_eq!(remove_prepending(&[]), Vec::<Asn>::new());
        assert_eq!(remove_prepending(&[5, 5, 6, 5, 5]), vec![5, 6, 5]);
        assert!(has_cycle(&[5, 6, 5]));
        assert!(!has_cycle(&[5, 6, 7]));
        assert!(!has_cycle(&[]));
    }

    #[test]
    fn links_are_consecutive_pairs() {
        let path: CanonicalPath = "3 2 1".parse().unwrap();
        assert_eq!(
            path.links().collect::<Vec<_>>(),
            vec![AsLink::new(2, 3), AsLink::new(1, 2)]
        );
    }
}
