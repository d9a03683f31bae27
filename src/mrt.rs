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
//! Read RIB entries directly from (compressed) MRT TABLE_DUMP_V2 files.
use std::{
    io::{self, Read},
    path::Path,
    vec,
};

use bgpkit_parser::{
    models::{BgpElem, ElemType},
    BgpkitParser, Elementor, ParserError,
};

use crate::records::{RecordError, RibRecord};

#[derive(Debug, thiserror::Error)]
#[error("Cannot open MRT dump {path:?}: {msg}")]
pub struct MrtError {
    pub path: String,
    pub msg: String,
}

/// Iterator over the routes of an MRT dump.
///
/// Messages that cannot be parsed are returned as [`RecordError::MrtMessage`] and reading
/// continues. I/O errors of the underlying stream (including a corrupt compression layer or a
/// dump that ends in the middle of a message) are returned as [`RecordError::Io`] and end the
/// iteration. Withdrawals (only present in update dumps) are returned as
/// [`RecordError::WrongType`].
pub struct MrtRecords<R> {
    parser: BgpkitParser<R>,
    elementor: Elementor,
    pending: vec::IntoIter<BgpElem>,
    done: bool,
}

impl<R: Read> MrtRecords<R> {
    pub fn new(parser: BgpkitParser<R>) -> Self {
        Self {
            parser,
            elementor: Elementor::new(),
            pending: Vec::new().into_iter(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for MrtRecords<R> {
    type Item = Result<RibRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(elem) = self.pending.next() {
                return Some(elem_to_record(elem));
            }
            if self.done {
                return None;
            }
            match self.parser.next_record() {
                Ok(record) => self.pending = self.elementor.record_to_elems(record).into_iter(),
                Err(e) => match e.error {
                    ParserError::EofExpected | ParserError::FilterError(_) => self.done = true,
                    ParserError::IoError(e) | ParserError::EofError(e) => {
                        self.done = true;
                        return Some(Err(RecordError::Io(e)));
                    }
                    ParserError::OneIoError(e) => {
                        self.done = true;
                        return Some(Err(RecordError::Io(io::Error::new(
                            io::ErrorKind::Other,
                            e.to_string(),
                        ))));
                    }
                    ParserError::ParseError(msg)
                    | ParserError::TruncatedMsg(msg)
                    | ParserError::Unsupported(msg) => {
                        log::debug!("Skipping MRT message: {msg}");
                        return Some(Err(RecordError::MrtMessage(msg)));
                    }
                },
            }
        }
    }
}

/// Open an MRT file and iterate over all routes in it.
pub fn mrt_records(path: &Path) -> Result<MrtRecords<Box<dyn Read + Send>>, MrtError> {
    let path = path.to_string_lossy().to_string();
    let parser = BgpkitParser::new(&path).map_err(|e| MrtError {
        path: path.clone(),
        msg: e.to_string(),
    })?;
    Ok(MrtRecords::new(parser))
}

fn elem_to_record(elem: BgpElem) -> Result<RibRecord, RecordError> {
    if matches!(elem.elem_type, ElemType::WITHDRAW) {
        return Err(RecordError::WrongType {
            record_type: "mrt".to_string(),
            elem_type: "W".to_string(),
        });
    }
    let as_path = elem
        .as_path
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_default();
    Ok(RibRecord::new(elem.prefix.prefix.to_string(), as_path))
}
