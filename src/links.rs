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
//! Module to aggregate canonical AS paths into undirected AS links with visit counts.
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    io::{Read, Write},
    path::Path,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{path::CanonicalPath, Asn};

/// An undirected link between two ASes. The smaller ASN is always stored first, such that
/// `AsLink::new(a, b) == AsLink::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsLink {
    a: Asn,
    b: Asn,
}

impl AsLink {
    pub fn new(x: Asn, y: Asn) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The smaller ASN of the link.
    pub fn first(&self) -> Asn {
        self.a
    }

    /// The larger ASN of the link.
    pub fn second(&self) -> Asn {
        self.b
    }
}

impl fmt::Display for AsLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{} -- AS{}", self.a, self.b)
    }
}

/// One row of the link table as written to CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub as1: Asn,
    pub as2: Asn,
    pub count: u64,
}

/// Multiset of undirected AS links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCounter {
    counts: HashMap<AsLink, u64>,
}

impl LinkCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one observation of `link`.
    pub fn add_link(&mut self, link: AsLink) {
        self.add_link_n(link, 1);
    }

    fn add_link_n(&mut self, link: AsLink, n: u64) {
        match self.counts.entry(link) {
            Entry::Occupied(mut e) => *e.get_mut() += n,
            Entry::Vacant(e) => {
                log::trace!("New link {link}");
                e.insert(n);
            }
        }
    }

    /// Count every link along the canonical path.
    pub fn add_path(&mut self, path: &CanonicalPath) {
        path.links().for_each(|link| self.add_link(link));
    }

    /// Number of times the link between `x` and `y` was observed (in either direction).
    pub fn get(&self, x: Asn, y: Asn) -> u64 {
        self.counts.get(&AsLink::new(x, y)).copied().unwrap_or(0)
    }

    /// Number of distinct links.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all visit counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AsLink, u64)> + '_ {
        self.counts.iter().map(|(link, count)| (*link, *count))
    }

    /// All links with their counts, ordered by `(as1, as2)`.
    pub fn sorted(&self) -> Vec<(AsLink, u64)> {
        self.iter().sorted().collect()
    }

    /// Add all counts of `other` into `self`.
    pub fn merge(&mut self, other: LinkCounter) {
        if self.counts.len() < other.counts.len() {
            let mine = std::mem::replace(&mut self.counts, other.counts);
            mine.into_iter().for_each(|(l, c)| self.add_link_n(l, c));
        } else {
            other
                .counts
                .into_iter()
                .for_each(|(l, c)| self.add_link_n(l, c));
        }
    }

    /// Write the link table as CSV with the header `as1,as2,count`, ordered by `(as1, as2)`. The
    /// header is written even if the table is empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv.write_record(["as1", "as2", "count"])?;
        for (link, count) in self.sorted() {
            csv.serialize(LinkRecord {
                as1: link.first(),
                as2: link.second(),
                count,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(std::io::BufWriter::new(file))
    }

    /// Read a link table previously written with [`LinkCounter::write_csv`]. Rows of the same link
    /// are summed up, regardless of the order of `as1` and `as2`.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv = csv::Reader::from_reader(reader);
        let mut counter = Self::new();
        for record in csv.deserialize() {
            let LinkRecord { as1, as2, count } = record?;
            counter.add_link_n(AsLink::new(as1, as2), count);
        }
        Ok(counter)
    }

    pub fn read_csv_file(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_csv(std::io::BufReader::new(file))
    }
}

impl FromIterator<AsLink> for LinkCounter {
    fn from_iter<T: IntoIterator<Item = AsLink>>(iter: T) -> Self {
        let mut counter = Self::new();
        iter.into_iter().for_each(|link| counter.add_link(link));
        counter
    }
}

impl Extend<CanonicalPath> for LinkCounter {
    fn extend<T: IntoIterator<Item = CanonicalPath>>(&mut self, iter: T) {
        iter.into_iter().for_each(|path| self.add_path(&path));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(s: &str) -> CanonicalPath {
        s.parse().unwrap()
    }

    #[test]
    fn link_is_undirected() {
        assert_eq!(AsLink::new(1, 2), AsLink::new(2, 1));
        assert_eq!(AsLink::new(20, 3).first(), 3);
        assert_eq!(AsLink::new(20, 3).second(), 20);
    }

    #[test]
    fn symmetric_aggregation() {
        let mut counter = LinkCounter::new();
        counter.add_path(&path("10 20"));
        counter.add_path(&path("20 10"));
        assert_eq!(counter.len(), 1);
        assert_eq!(counter.get(10, 20), 2);
        assert_eq!(counter.get(20, 10), 2);
        assert_eq!(counter.total(), 2);
    }

    #[test]
    fn order_independent() {
        let paths = ["1 2 3", "3 2", "4 1 2", "2 1", "5 6 7 8"];
        let forward: LinkCounter = {
            let mut c = LinkCounter::new();
            c.extend(paths.iter().map(|p| path(p)));
            c
        };
        for perm in paths.iter().permutations(paths.len()) {
            let mut c = LinkCounter::new();
            c.extend(perm.into_iter().map(|p| path(p)));
            assert_eq!(c, forward);
        }
        assert_eq!(forward.get(1, 2), 3);
        assert_eq!(forward.get(2, 3), 2);
        assert_eq!(forward.get(1, 4), 1);
        assert_eq!(forward.get(1, 3), 0);
    }

    #[test]
    fn merge_equals_union() {
        let a = ["1 2 3", "2 3"];
        let b = ["3 2", "7 8", "8 7 6"];

        let mut left = LinkCounter::new();
        left.extend(a.iter().map(|p| path(p)));
        let mut right = LinkCounter::new();
        right.extend(b.iter().map(|p| path(p)));

        let mut union = LinkCounter::new();
        union.extend(a.iter().chain(b.iter()).map(|p| path(p)));

        let mut merged = left.clone();
        merged.merge(right.clone());
        assert_eq!(merged, union);

        // merging into the smaller side gives the same result
        let mut merged = right;
        merged.merge(left);
        assert_eq!(merged, union);
    }

    #[test]
    fn csv_output() {
        let mut counter: LinkCounter = [AsLink::new(3, 1), AsLink::new(1, 2), AsLink::new(1, 3)]
            .into_iter()
            .collect();
        counter.add_link(AsLink::new(200, 100));

        let mut buf = Vec::new();
        counter.write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "as1,as2,count\n1,2,1\n1,3,2\n100,200,1\n"
        );

        let read_back = LinkCounter::read_csv(buf.as_slice()).unwrap();
        assert_eq!(read_back, counter);
    }

    #[test]
    fn empty_table_has_header() {
        let mut buf = Vec::new();
        LinkCounter::new().write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "as1,as2,count\n");
        assert!(LinkCounter::read_csv(buf.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn read_sums_reversed_rows() {
        let table = "as1,as2,count\n1,2,3\n2,1,4\n";
        let counter = LinkCounter::read_csv(table.as_bytes()).unwrap();
        assert_eq!(counter.len(), 1);
        assert_eq!(counter.get(1, 2), 7);
    }
}
