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
use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressIterator;

use aslinks::{
    pipeline::{open_records, validate, Outcome, Skip, Stats},
    prefix_filter::BogonMatch,
    records::{PairWriter, RecordFormat},
    util,
};

/// Reduce a RIB dump to the `prefix|as-path` rows with a valid prefix and a valid AS path.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// RIB dump to read.
    input: PathBuf,
    /// Format of the input.
    #[arg(short, long, value_enum, default_value_t = RecordFormat::BgpStream)]
    format: RecordFormat,
    /// List of IPv4 bogons, one prefix per line.
    #[arg(long, default_value = "./cymru/fullbogons-ipv4.txt")]
    bogons_v4: PathBuf,
    /// List of IPv6 bogons, one prefix per line.
    #[arg(long, default_value = "./cymru/fullbogons-ipv6.txt")]
    bogons_v6: PathBuf,
    /// How to match prefixes against the bogon lists.
    #[arg(long, value_enum, default_value_t = BogonMatch::Exact)]
    bogon_match: BogonMatch,
    /// Output path of the `prefix|as-path` rows.
    #[arg(short, long, default_value = "prefixes_aspaths.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let multi = util::init_logging();
    let args = Args::parse();

    let filter =
        util::build_prefix_filter(&args.bogons_v4, &args.bogons_v6, args.bogon_match, &[])?;

    let records = open_records(args.format, &args.input)
        .with_context(|| format!("Cannot read {:?}", args.input))?;
    let output = File::create(&args.output)
        .with_context(|| format!("Cannot create {:?}", args.output))?;
    let mut writer = PairWriter::new(BufWriter::new(output));

    let spinner = util::record_spinner(&multi, args.input.display().to_string());
    let mut stats = Stats::default();
    for record in records.progress_with(spinner.clone()) {
        let outcome = match record {
            Ok(record) => match validate(&filter, &record) {
                Ok(path) => {
                    writer.write(&record)?;
                    Outcome::Accepted(path)
                }
                Err(skip) => Outcome::Skipped(skip),
            },
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("Cannot read {:?}", args.input))
            }
            Err(e) => Outcome::Skipped(Skip::from(&e)),
        };
        stats.count(&outcome);
    }
    writer.flush()?;
    spinner.finish_and_clear();

    log::info!("{:?}: {stats}", args.input);
    log::info!("Wrote {} rows to {:?}", stats.accepted, args.output);

    Ok(())
}
