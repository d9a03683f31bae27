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
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use aslinks::{
    links::LinkCounter,
    pipeline::{count_links_in_file, merge_results, set_link_stats},
    prefix_filter::BogonMatch,
    records::RecordFormat,
    util,
};

/// Count the undirected AS links observed in the AS paths of one or more RIB dumps.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// RIB dumps to read. Multiple inputs are processed in parallel.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Format of the inputs.
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
    /// Only keep prefixes present in these RouteViews pfx2as files. Can be applied multiple times.
    #[arg(long)]
    pfx2as: Vec<PathBuf>,
    /// Existing link tables (`as1,as2,count`) to add to the result. Can be applied multiple times.
    #[arg(long)]
    merge: Vec<PathBuf>,
    /// Output path of the link table.
    #[arg(short, long, default_value = "as_links_count.csv")]
    output: PathBuf,
    /// Write the processing statistics as JSON to this path.
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn main() -> Result<()> {
    let multi = util::init_logging();
    let args = Args::parse();

    let filter =
        util::build_prefix_filter(&args.bogons_v4, &args.bogons_v6, args.bogon_match, &args.pfx2as)?;

    log::info!(
        "Counting AS links in {} {:?} input(s)",
        args.inputs.len(),
        args.format
    );
    let pb = util::file_progress(&multi, args.inputs.len());
    let results = args
        .inputs
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| {
            count_links_in_file(&filter, args.format, path)
                .with_context(|| format!("Error processing {path:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();

    let (mut links, mut stats) = merge_results(results);
    log::info!("Total: {stats}");

    for path in &args.merge {
        let table = LinkCounter::read_csv_file(path)
            .with_context(|| format!("Cannot read link table {path:?}"))?;
        log::info!("Merging {} links from {path:?}", table.len());
        links.merge(table);
    }
    set_link_stats(&mut stats, &links);

    links
        .write_csv_file(&args.output)
        .with_context(|| format!("Cannot write link table {:?}", args.output))?;
    log::info!(
        "Wrote {} links ({} observations) to {:?}",
        links.len(),
        links.total(),
        args.output
    );

    if let Some(stats_path) = &args.stats {
        stats
            .write_json(stats_path)
            .with_context(|| format!("Cannot write statistics to {stats_path:?}"))?;
    }

    Ok(())
}
