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
    bogons::PrefixSet,
    pipeline::{open_records, retain_announced},
    records::{PairWriter, RecordFormat},
    util,
};

/// Keep only the `prefix|as-path` rows whose prefix is announced according to RouteViews pfx2as.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// RouteViews pfx2as files (IPv4 and IPv6). Can be applied multiple times.
    #[arg(long, required = true)]
    pfx2as: Vec<PathBuf>,
    /// Input rows in the `prefix|as-path` format.
    #[arg(short, long, default_value = "prefixes_aspaths.csv")]
    input: PathBuf,
    /// Output path of the retained rows.
    #[arg(short, long, default_value = "filtered_prefixes_aspaths.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let multi = util::init_logging();
    let args = Args::parse();

    let announced = PrefixSet::load_all(&args.pfx2as, PrefixSet::load_pfx2as)?;

    let records = open_records(RecordFormat::Pairs, &args.input)
        .with_context(|| format!("Cannot read {:?}", args.input))?;
    let output = File::create(&args.output)
        .with_context(|| format!("Cannot create {:?}", args.output))?;
    let mut writer = PairWriter::new(BufWriter::new(output));

    let spinner = util::record_spinner(&multi, args.input.display().to_string());
    let (kept, dropped) =
        retain_announced(&announced, records.progress_with(spinner.clone()), &mut writer)
            .with_context(|| format!("Cannot filter {:?}", args.input))?;
    writer.flush()?;
    spinner.finish_and_clear();

    log::info!(
        "Kept {kept} rows and dropped {dropped} rows of {:?}; wrote {:?}",
        args.input,
        args.output
    );

    Ok(())
}
