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
//! Module defining the RIB record formats and how to read (and write) them.
//!
//! Two text formats are supported, both pipe-delimited:
//!
//! - [`RecordFormat::BgpStream`]: the string representation of a BGPStream element, e.g.,
//!   `rib|R|1714521600.000000|ris|rrc00|None|None|3333|193.0.0.56|1.0.0.0/24|193.0.0.56|3333 13335|...`
//! - [`RecordFormat::Pairs`]: only the prefix and the AS path, e.g., `1.0.0.0/24|3333 13335`.
//!
//! Binary MRT dumps are handled in [`crate::mrt`].
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

/// Minimal number of fields of a BGPStream element.
pub const BGPSTREAM_NUM_FIELDS: usize = 12;
const BGPSTREAM_RECORD_TYPE: usize = 0;
const BGPSTREAM_ELEM_TYPE: usize = 1;
const BGPSTREAM_PREFIX: usize = 9;
const BGPSTREAM_AS_PATH: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum RecordFormat {
    /// Pipe-delimited BGPStream elements (`rib|R|...|prefix|next-hop|as-path|...`).
    #[value(name = "bgpstream")]
    BgpStream,
    /// Pipe-delimited `prefix|as-path` rows.
    Pairs,
    /// Binary MRT RIB dump (optionally compressed).
    Mrt,
}

/// One route from a RIB: the announced prefix and the raw AS path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RibRecord {
    pub prefix: String,
    pub as_path: String,
}

impl RibRecord {
    pub fn new(prefix: impl Into<String>, as_path: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            as_path: as_path.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed record with {fields} fields")]
    Malformed { fields: usize },
    #[error("Not a RIB entry (record type {record_type:?}, element type {elem_type:?})")]
    WrongType {
        record_type: String,
        elem_type: String,
    },
    #[error("MRT dumps cannot be parsed line by line")]
    NotText,
    #[error("Cannot parse MRT message: {0}")]
    MrtMessage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordError {
    /// Whether reading must be aborted. Only I/O errors of the underlying stream are fatal, all
    /// other errors only concern the current record.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Csv(e) => e.is_io_error(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

impl RecordFormat {
    /// Extract a `RibRecord` from the fields of one line.
    pub fn parse_fields(&self, fields: &csv::StringRecord) -> Result<RibRecord, RecordError> {
        match self {
            Self::BgpStream => {
                if fields.len() < BGPSTREAM_NUM_FIELDS {
                    return Err(RecordError::Malformed {
                        fields: fields.len(),
                    });
                }
                let record_type = &fields[BGPSTREAM_RECORD_TYPE];
                let elem_type = &fields[BGPSTREAM_ELEM_TYPE];
                if record_type != "rib" || elem_type != "R" {
                    return Err(RecordError::WrongType {
                        record_type: record_type.to_string(),
                        elem_type: elem_type.to_string(),
                    });
                }
                Ok(RibRecord::new(
                    &fields[BGPSTREAM_PREFIX],
                    &fields[BGPSTREAM_AS_PATH],
                ))
            }
            Self::Pairs => {
                if fields.len() < 2 {
                    return Err(RecordError::Malformed {
                        fields: fields.len(),
                    });
                }
                Ok(RibRecord::new(&fields[0], &fields[1]))
            }
            Self::Mrt => Err(RecordError::NotText),
        }
    }

    pub fn is_text(&self) -> bool {
        !matches!(self, Self::Mrt)
    }
}

/// Iterator over the records of a pipe-delimited text stream.
pub struct TextRecords<R> {
    format: RecordFormat,
    reader: csv::Reader<R>,
    buf: csv::StringRecord,
    done: bool,
}

impl<R: Read> TextRecords<R> {
    /// Create a record iterator. `format` must be a text format.
    pub fn new(format: RecordFormat, reader: R) -> Self {
        debug_assert!(format.is_text());
        Self {
            format,
            reader: csv::ReaderBuilder::new()
                .delimiter(b'|')
                .has_headers(false)
                .flexible(true)
                .quoting(false)
                .from_reader(reader),
            buf: csv::StringRecord::new(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for TextRecords<R> {
    type Item = Result<RibRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record(&mut self.buf) {
            Ok(true) => Some(self.format.parse_fields(&self.buf)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                if e.is_io_error() {
                    self.done = true;
                }
                Some(Err(e.into()))
            }
        }
    }
}

/// Writes `prefix|as-path` rows, readable with [`RecordFormat::Pairs`].
pub struct PairWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PairWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(b'|')
                .has_headers(false)
                .quote_style(csv::QuoteStyle::Never)
                .from_writer(writer),
        }
    }

    pub fn write(&mut self, record: &RibRecord) -> Result<(), csv::Error> {
        self.writer
            .write_record([record.prefix.as_str(), record.as_path.as_str()])
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const RIB: &str = "rib|R|1714521600.000000|ris|rrc00|None|None|3333|193.0.0.56|1.0.0.0/24|193.0.0.56|3333 13335|3333:100|None|None\n\
                       rib|R|1714521600.000000|ris|rrc00|None|None|3333|193.0.0.56|2001:db8::/32|193.0.0.56|3333 1299 1299 6939|None|None|None\n\
                       update|W|1714521600.000000|ris|rrc00|None|None|3333|193.0.0.56|1.0.0.0/24|None|None|None|None|None\n\
                       rib|R|broken\n";

    #[test]
    fn bgpstream_format() {
        let records = TextRecords::new(RecordFormat::BgpStream, RIB.as_bytes()).collect::<Vec<_>>();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0].as_ref().unwrap(),
            &RibRecord::new("1.0.0.0/24", "3333 13335")
        );
        assert_eq!(
            records[1].as_ref().unwrap(),
            &RibRecord::new("2001:db8::/32", "3333 1299 1299 6939")
        );
        assert!(matches!(records[2], Err(RecordError::WrongType { .. })));
        assert!(matches!(
            records[3],
            Err(RecordError::Malformed { fields: 3 })
        ));
        assert!(records.iter().all(|r| !r.as_ref().is_err_and(|e| e.is_fatal())));
    }

    #[test]
    fn pairs_format() {
        let input = "1.0.0.0/24|3333 13335\n\n2.0.0.0/16\n8.8.8.0/24|15169|ignored\n";
        let records = TextRecords::new(RecordFormat::Pairs, input.as_bytes()).collect::<Vec<_>>();
        // the csv reader skips empty lines
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].as_ref().unwrap(),
            &RibRecord::new("1.0.0.0/24", "3333 13335")
        );
        assert!(matches!(
            records[1],
            Err(RecordError::Malformed { fields: 1 })
        ));
        assert_eq!(
            records[2].as_ref().unwrap(),
            &RibRecord::new("8.8.8.0/24", "15169")
        );
    }

    #[test]
    fn write_pairs() {
        let mut buf = Vec::new();
        {
            let mut writer = PairWriter::new(&mut buf);
            writer
                .write(&RibRecord::new("1.0.0.0/24", "3333 13335"))
                .unwrap();
            writer
                .write(&RibRecord::new("2001:db8::/32", "1 2 3"))
                .unwrap();
            writer.flush().unwrap();
        }
        let written = String::from_utf8(buf).unwrap();
        assert_eq!(written, "1.0.0.0/24|3333 13335\n2001:db8::/32|1 2 3\n");

        let records = TextRecords::new(RecordFormat::Pairs, written.as_bytes())
            .map(Result::unwrap)
            .collect::<Vec<_>>();
        assert_eq!(records[1], RibRecord::new("2001:db8::/32", "1 2 3"));
    }
}
