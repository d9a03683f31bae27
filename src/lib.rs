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
//! Library for extracting undirected AS links and their visit counts from BGP RIB dumps.

/// Autonomous system number.
pub type Asn = u32;

pub mod bogons;
pub mod links;
pub mod mrt;
pub mod path;
pub mod pipeline;
pub mod prefix_filter;
pub mod records;
pub mod util;

pub mod prelude {
    pub use super::{
        bogons::PrefixSet,
        links::{AsLink, LinkCounter},
        path::{CanonicalPath, PathError},
        pipeline::{LinkExtractor, Outcome, Skip, Stats},
        prefix_filter::{BogonMatch, PrefixFilter, PrefixVerdict},
        records::{RecordFormat, RibRecord},
        Asn,
    };
}
