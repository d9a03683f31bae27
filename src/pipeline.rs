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
//! The ingestion pipeline: RIB records are filtered by prefix, their AS paths are canonicalized,
//! and the resulting paths are folded into a [`LinkCounter`].
//!
//! Each input is processed sequentially, one record at a time. Multiple inputs can be processed
//! in parallel, each into its own counter, which are merged at the end.
use std::{
    fmt,
    fs::File,
    io::{BufReader, Read, Write},
    ops::AddAssign,
    path::{Path, PathBuf},
};

use ipnet::IpNet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    bogons::{BogonError, PrefixSet},
    links::LinkCounter,
    mrt::{mrt_records, MrtError},
    path::{CanonicalPath, PathError},
    prefix_filter::{PrefixFilter, PrefixVerdict},
    records::{PairWriter, RecordError, RecordFormat, RibRecord, TextRecords},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Cannot read input: {0}")]
    Record(#[from] RecordError),
    #[error("{0}")]
    Mrt(#[from] MrtError),
    #[error("{0}")]
    Bogon(#[from] BogonError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reason why a record did not contribute any links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skip {
    Malformed,
    WrongType,
    UnparsablePrefix,
    Bogon,
    MaskLength,
    NotAnnounced,
    InvalidPath,
    Cycle,
    TooShort,
}

impl From<&RecordError> for Skip {
    fn from(e: &RecordError) -> Self {
        match e {
            RecordError::WrongType { .. } => Self::WrongType,
            RecordError::Malformed { .. }
            | RecordError::NotText
            | RecordError::MrtMessage(_)
            | RecordError::Csv(_)
            | RecordError::Io(_) => Self::Malformed,
        }
    }
}

impl From<PathError> for Skip {
    fn from(e: PathError) -> Self {
        match e {
            PathError::InvalidToken(_) => Self::InvalidPath,
            PathError::Cycle => Self::Cycle,
            PathError::TooShort => Self::TooShort,
        }
    }
}

/// Result of processing a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(CanonicalPath),
    Skipped(Skip),
}

/// Counters describing what happened to the records of one or more inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub records: u64,
    pub malformed: u64,
    pub wrong_type: u64,
    pub unparsable_prefix: u64,
    pub bogon: u64,
    pub mask_length: u64,
    pub not_announced: u64,
    pub invalid_path: u64,
    pub cycle: u64,
    pub too_short: u64,
    pub accepted: u64,
    pub distinct_links: u64,
    pub link_observations: u64,
}

impl Stats {
    pub fn count(&mut self, outcome: &Outcome) {
        self.records += 1;
        let field = match outcome {
            Outcome::Accepted(_) => &mut self.accepted,
            Outcome::Skipped(skip) => match skip {
                Skip::Malformed => &mut self.malformed,
                Skip::WrongType => &mut self.wrong_type,
                Skip::UnparsablePrefix => &mut self.unparsable_prefix,
                Skip::Bogon => &mut self.bogon,
                Skip::MaskLength => &mut self.mask_length,
                Skip::NotAnnounced => &mut self.not_announced,
                Skip::InvalidPath => &mut self.invalid_path,
                Skip::Cycle => &mut self.cycle,
                Skip::TooShort => &mut self.too_short,
            },
        };
        *field += 1;
    }

    /// Number of records dropped because of their prefix.
    pub fn invalid_prefix(&self) -> u64 {
        self.unparsable_prefix + self.bogon + self.mask_length + self.not_announced
    }

    /// Number of records dropped because of their AS path.
    pub fn rejected_path(&self) -> u64 {
        self.invalid_path + self.cycle + self.too_short
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.records += rhs.records;
        self.malformed += rhs.malformed;
        self.wrong_type += rhs.wrong_type;
        self.unparsable_prefix += rhs.unparsable_prefix;
        self.bogon += rhs.bogon;
        self.mask_length += rhs.mask_length;
        self.not_announced += rhs.not_announced;
        self.invalid_path += rhs.invalid_path;
        self.cycle += rhs.cycle;
        self.too_short += rhs.too_short;
        self.accepted += rhs.accepted;
        // the link table sizes are recomputed after merging the counters
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} accepted, {} malformed, {} not RIB entries, {} invalid prefixes \
             ({} bogons, {} mask length, {} not announced), {} rejected paths ({} cycles, \
             {} too short, {} AS sets); {} links observed {} times",
            self.records,
            self.accepted,
            self.malformed,
            self.wrong_type,
            self.invalid_prefix(),
            self.bogon,
            self.mask_length,
            self.not_announced,
            self.rejected_path(),
            self.cycle,
            self.too_short,
            self.invalid_path,
            self.distinct_links,
            self.link_observations,
        )
    }
}

/// Check a record against the prefix filter and canonicalize its AS path.
pub fn validate(filter: &PrefixFilter, record: &RibRecord) -> Result<CanonicalPath, Skip> {
    match filter.check(&record.prefix) {
        PrefixVerdict::Valid(_) => {}
        PrefixVerdict::Unparsable => return Err(Skip::UnparsablePrefix),
        PrefixVerdict::Bogon => return Err(Skip::Bogon),
        PrefixVerdict::MaskLength => return Err(Skip::MaskLength),
        PrefixVerdict::NotAnnounced => return Err(Skip::NotAnnounced),
    }
    record.as_path.parse::<CanonicalPath>().map_err(Skip::from)
}

/// Open an input of the given format and iterate over its records.
pub fn open_records(
    format: RecordFormat,
    path: impl AsRef<Path>,
) -> Result<Box<dyn Iterator<Item = Result<RibRecord, RecordError>>>, Error> {
    let path = path.as_ref();
    if format.is_text() {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Box::new(TextRecords::new(format, BufReader::new(file))))
    } else {
        Ok(Box::new(mrt_records(path)?))
    }
}

/// Folds RIB records into a [`LinkCounter`], keeping track of [`Stats`].
pub struct LinkExtractor<'a> {
    filter: &'a PrefixFilter,
    links: LinkCounter,
    stats: Stats,
}

impl<'a> LinkExtractor<'a> {
    pub fn new(filter: &'a PrefixFilter) -> Self {
        Self {
            filter,
            links: LinkCounter::new(),
            stats: Stats::default(),
        }
    }

    /// Process a single record, adding the links of its path if it is accepted.
    pub fn process(&mut self, record: &RibRecord) -> Outcome {
        let outcome = match validate(self.filter, record) {
            Ok(path) => {
                self.links.add_path(&path);
                Outcome::Accepted(path)
            }
            Err(skip) => {
                log::trace!("Skipping {record:?}: {skip:?}");
                Outcome::Skipped(skip)
            }
        };
        self.stats.count(&outcome);
        outcome
    }

    /// Process all records of an iterator. Malformed records are skipped; the first fatal error
    /// aborts processing and is returned.
    pub fn process_records<I>(&mut self, records: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<RibRecord, RecordError>>,
    {
        for record in records {
            match record {
                Ok(record) => {
                    self.process(&record);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    log::trace!("Skipping record: {e}");
                    self.stats.count(&Outcome::Skipped(Skip::from(&e)));
                }
            }
        }
        Ok(())
    }

    pub fn process_reader<R: Read>(&mut self, format: RecordFormat, reader: R) -> Result<(), Error> {
        self.process_records(TextRecords::new(format, reader))
    }

    pub fn process_file(&mut self, format: RecordFormat, path: impl AsRef<Path>) -> Result<(), Error> {
        self.process_records(open_records(format, path)?)
    }

    pub fn links(&self) -> &LinkCounter {
        &self.links
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Return the link counter and the final statistics.
    pub fn finish(self) -> (LinkCounter, Stats) {
        let mut stats = self.stats;
        set_link_stats(&mut stats, &self.links);
        (self.links, stats)
    }
}

/// Set the link fields of `stats` to describe `links`.
pub fn set_link_stats(stats: &mut Stats, links: &LinkCounter) {
    stats.distinct_links = links.len() as u64;
    stats.link_observations = links.total();
}

/// Count the links in a single input.
pub fn count_links_in_file(
    filter: &PrefixFilter,
    format: RecordFormat,
    path: impl AsRef<Path>,
) -> Result<(LinkCounter, Stats), Error> {
    let path = path.as_ref();
    let mut extractor = LinkExtractor::new(filter);
    extractor.process_file(format, path)?;
    let (links, stats) = extractor.finish();
    log::info!("{path:?}: {stats}");
    Ok((links, stats))
}

/// Merge the link counters and statistics of multiple inputs.
pub fn merge_results(
    results: impl IntoIterator<Item = (LinkCounter, Stats)>,
) -> (LinkCounter, Stats) {
    let (links, mut stats) = results.into_iter().fold(
        (LinkCounter::new(), Stats::default()),
        |(mut links, mut stats), (l, s)| {
            links.merge(l);
            stats += s;
            (links, stats)
        },
    );
    set_link_stats(&mut stats, &links);
    (links, stats)
}

/// Count the links of several inputs in parallel and merge the results.
pub fn count_links_in_files<P>(
    filter: &PrefixFilter,
    format: RecordFormat,
    paths: &[P],
) -> Result<(LinkCounter, Stats), Error>
where
    P: AsRef<Path> + Sync,
{
    let results = paths
        .par_iter()
        .map(|path| count_links_in_file(filter, format, path))
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(merge_results(results))
}

/// Copy the records whose prefix is contained in `announced` to `writer`. Records with an
/// unparsable prefix or that cannot be decoded are dropped. Returns the number of kept and dropped
/// records.
pub fn retain_announced<I, W>(
    announced: &PrefixSet,
    records: I,
    writer: &mut PairWriter<W>,
) -> Result<(u64, u64), Error>
where
    I: IntoIterator<Item = Result<RibRecord, RecordError>>,
    W: Write,
{
    let (mut kept, mut dropped) = (0, 0);
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                log::trace!("Skipping record: {e}");
                dropped += 1;
                continue;
            }
        };
        match record.prefix.trim().parse::<IpNet>() {
            Ok(net) if announced.contains(&net) => {
                writer.write(&record)?;
                kept += 1;
            }
            _ => dropped += 1,
        }
    }
    Ok((kept, dropped))
}

#[cfg(test)]
mod test {
    use super::*;

    fn filter() -> PrefixFilter {
        PrefixFilter::new(
            ["10.0.0.0/24", "2001:db8::/32"]
                .into_iter()
                .map(|p| p.parse().unwrap())
                .collect::<PrefixSet>(),
        )
    }

    const PAIRS: &str = "192.0.2.0/24|1 2 2 3\n\
                         10.0.0.0/24|4 5\n\
                         2001:db8::/80|4 5\n\
                         2a00::/32|3 2 1\n\
                         198.51.100.0/24|1 2 1\n\
                         198.51.100.0/24|7\n\
                         198.51.100.0/24|7 {8,9}\n\
                         not-a-prefix|1 2\n\
                         truncated\n";

    #[test]
    fn pipeline_counts() {
        let filter = filter();
        let mut extractor = LinkExtractor::new(&filter);
        extractor
            .process_reader(RecordFormat::Pairs, PAIRS.as_bytes())
            .unwrap();
        let (links, stats) = extractor.finish();

        assert_eq!(links.len(), 2);
        assert_eq!(links.get(1, 2), 2);
        assert_eq!(links.get(2, 3), 2);
        assert_eq!(links.get(4, 5), 0);

        assert_eq!(
            stats,
            Stats {
                records: 9,
                malformed: 1,
                wrong_type: 0,
                unparsable_prefix: 1,
                bogon: 1,
                mask_length: 1,
                not_announced: 0,
                invalid_path: 1,
                cycle: 1,
                too_short: 1,
                accepted: 2,
                distinct_links: 2,
                link_observations: 4,
            }
        );
    }

    #[test]
    fn process_single_records() {
        let filter = filter();
        let mut extractor = LinkExtractor::new(&filter);
        assert_eq!(
            extractor.process(&RibRecord::new("192.0.2.0/24", "1 2 2 3")),
            Outcome::Accepted("1 2 3".parse().unwrap())
        );
        assert_eq!(
            extractor.process(&RibRecord::new("192.0.2.0/24", "1 2 1")),
            Outcome::Skipped(Skip::Cycle)
        );
        assert_eq!(
            extractor.process(&RibRecord::new("192.0.2.0/24", "1")),
            Outcome::Skipped(Skip::TooShort)
        );
        assert_eq!(
            extractor.process(&RibRecord::new("10.0.0.0/24", "1 2")),
            Outcome::Skipped(Skip::Bogon)
        );
        assert_eq!(extractor.stats().records, 4);
        assert_eq!(extractor.links().total(), 2);
    }

    #[test]
    fn bgpstream_wrong_type_is_counted() {
        let input = "update|W|0|ris|rrc00|None|None|1|::1|192.0.2.0/24|None|None\n\
                     rib|R|0|ris|rrc00|None|None|1|::1|192.0.2.0/24|::1|1 2\n";
        let filter = filter();
        let mut extractor = LinkExtractor::new(&filter);
        extractor
            .process_reader(RecordFormat::BgpStream, input.as_bytes())
            .unwrap();
        assert_eq!(extractor.stats().wrong_type, 1);
        assert_eq!(extractor.stats().accepted, 1);
        assert_eq!(extractor.links().get(2, 1), 1);
    }

    #[test]
    fn merging_is_order_independent() {
        let filter = filter();
        let inputs = ["192.0.2.0/24|1 2 3\n", "192.0.2.0/24|3 2\n192.0.2.0/24|5 6\n", "x\n"];
        let results = inputs
            .iter()
            .map(|input| {
                let mut e = LinkExtractor::new(&filter);
                e.process_reader(RecordFormat::Pairs, input.as_bytes()).unwrap();
                e.finish()
            })
            .collect::<Vec<_>>();

        let (forward, forward_stats) = merge_results(results.clone());
        let (backward, backward_stats) = merge_results(results.into_iter().rev());
        assert_eq!(forward, backward);
        assert_eq!(forward_stats, backward_stats);
        assert_eq!(forward.get(2, 3), 2);
        assert_eq!(forward_stats.records, 4);
        assert_eq!(forward_stats.malformed, 1);
        assert_eq!(forward_stats.distinct_links, 3);
        assert_eq!(forward_stats.link_observations, 4);
    }

    #[test]
    fn files_in_parallel() {
        let dir = std::env::temp_dir().join(format!("aslinks-pipeline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        std::fs::write(&a, "192.0.2.0/24|1 2 3\n").unwrap();
        std::fs::write(&b, "192.0.2.0/24|3 2 1\n10.0.0.0/24|1 2\n").unwrap();

        let (links, stats) =
            count_links_in_files(&filter(), RecordFormat::Pairs, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(links.get(1, 2), 2);
        assert_eq!(links.get(2, 3), 2);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.bogon, 1);

        let missing = dir.join("missing.txt");
        assert!(matches!(
            count_links_in_files(&filter(), RecordFormat::Pairs, &[a, missing]),
            Err(Error::Open { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn link_stats_follow_the_table() {
        let filter = filter();
        let mut e = LinkExtractor::new(&filter);
        e.process_reader(RecordFormat::Pairs, "192.0.2.0/24|1 2 3\n".as_bytes())
            .unwrap();
        let (mut links, mut stats) = merge_results([e.finish()]);
        assert_eq!((stats.distinct_links, stats.link_observations), (2, 2));

        let previous = LinkCounter::read_csv("as1,as2,count\n7,8,5\n".as_bytes()).unwrap();
        links.merge(previous);
        set_link_stats(&mut stats, &links);
        assert_eq!(stats.distinct_links, links.len() as u64);
        assert_eq!(stats.link_observations, links.total());
        assert_eq!((stats.distinct_links, stats.link_observations), (3, 7));
        // the record counters are untouched
        assert_eq!(stats.records, 1);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn corrupt_mrt_dump_is_an_error() {
        let dir = std::env::temp_dir().join(format!("aslinks-mrt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dump = dir.join("corrupt_rib.gz");
        // valid gzip header followed by an invalid deflate stream
        std::fs::write(
            &dump,
            [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff, 1, 2, 3, 4, 5, 6, 7],
        )
        .unwrap();

        let result = count_links_in_file(&PrefixFilter::default(), RecordFormat::Mrt, &dump);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn fatal_record_error_aborts() {
        let filter = filter();
        let mut e = LinkExtractor::new(&filter);
        let records = vec![
            Ok(RibRecord::new("192.0.2.0/24", "1 2")),
            Err(RecordError::MrtMessage("unsupported".to_string())),
            Err(RecordError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "corrupt deflate stream",
            ))),
            Ok(RibRecord::new("192.0.2.0/24", "3 4")),
        ];
        assert!(matches!(e.process_records(records), Err(Error::Record(_))));
        assert_eq!(e.stats().accepted, 1);
        assert_eq!(e.stats().malformed, 1);
        assert_eq!(e.links().get(3, 4), 0);
    }

    #[test]
    fn retain_announced_rows() {
        let announced: PrefixSet = ["192.0.2.0/24", "2001:db8::/32"]
            .into_iter()
            .map(|p| p.parse().unwrap())
            .collect();
        let input = "192.0.2.0/24|1 2 3\n\
                     198.51.100.0/24|4 5\n\
                     not-a-prefix|1 2\n\
                     2001:db8::/32|6 7\n\
                     truncated\n";

        let mut buf = Vec::new();
        let (kept, dropped) = {
            let mut writer = PairWriter::new(&mut buf);
            let counts = retain_announced(
                &announced,
                TextRecords::new(RecordFormat::Pairs, input.as_bytes()),
                &mut writer,
            )
            .unwrap();
            writer.flush().unwrap();
            counts
        };
        assert_eq!((kept, dropped), (2, 3));
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "192.0.2.0/24|1 2 3\n2001:db8::/32|6 7\n"
        );
    }
}
