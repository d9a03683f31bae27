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
//! Utility module collection of functions shared by the binaries.

use std::path::{Path, PathBuf};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;

use crate::{
    bogons::{BogonError, PrefixSet},
    prefix_filter::{BogonMatch, PrefixFilter},
};

/// Logging configuration file, used if it exists in the working directory.
pub const LOG_CONFIG: &str = "log4rs.yml";

/// Initialize logging. If `log4rs.yml` exists (and is valid), it configures the loggers. Otherwise,
/// log to stderr with `pretty_env_logger` (configured with `RUST_LOG`, default `info`). Either way,
/// log lines are routed through the returned `MultiProgress` such that they do not tear progress
/// bars apart.
pub fn init_logging() -> MultiProgress {
    let multi = MultiProgress::new();
    if let Some(logger) = load_log4rs(LOG_CONFIG) {
        let level = logger.max_log_level();
        if LogWrapper::new(multi.clone(), logger).try_init().is_ok() {
            log::set_max_level(level);
        }
        return multi;
    }

    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .build();
    let level = logger.filter();
    if LogWrapper::new(multi.clone(), logger).try_init().is_ok() {
        log::set_max_level(level);
    }
    multi
}

/// Build a log4rs logger from a config file, if it exists and is valid.
fn load_log4rs(path: impl AsRef<Path>) -> Option<log4rs::Logger> {
    let path = path.as_ref();
    if !path.exists() {
        return None;
    }
    match log4rs::config::load_config_file(path, Default::default()) {
        Ok(config) => Some(log4rs::Logger::new(config)),
        Err(e) => {
            eprintln!("Cannot initialize logging from {path:?}: {e}");
            None
        }
    }
}

/// Progress bar over a known number of input files.
pub fn file_progress(multi: &MultiProgress, num_files: usize) -> ProgressBar {
    multi.add(
        ProgressBar::new(num_files as u64).with_style(
            ProgressStyle::with_template(
                "[{bar:60}] files: {pos:>4}/{len:4}, elapsed: {elapsed}, eta: {eta}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        ),
    )
}

/// Spinner counting the records read from a single input.
pub fn record_spinner(multi: &MultiProgress, name: impl Into<String>) -> ProgressBar {
    let spinner = multi.add(ProgressBar::new_spinner().with_message(name.into()));
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}: {human_pos} records ({per_sec}), {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

/// Build the prefix filter from the IPv4 and IPv6 bogon lists and optional pfx2as files.
pub fn build_prefix_filter(
    bogons_v4: impl AsRef<Path>,
    bogons_v6: impl AsRef<Path>,
    mode: BogonMatch,
    pfx2as: &[PathBuf],
) -> Result<PrefixFilter, BogonError> {
    let mut bogons = PrefixSet::load_bogons(bogons_v4)?;
    bogons.extend_from(PrefixSet::load_bogons(bogons_v6)?);
    let mut filter = PrefixFilter::new(bogons).with_mode(mode);
    if !pfx2as.is_empty() {
        filter = filter.with_allow_list(PrefixSet::load_all(pfx2as, PrefixSet::load_pfx2as)?);
    }
    Ok(filter)
}
