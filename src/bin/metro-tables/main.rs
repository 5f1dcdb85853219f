//! Offline tool computing the minimum-stops and minimum-transfers tables from the line topology.
//!
//! Usage: `metro-tables [LINES_JSON] [OUT_DIR]`, defaulting to `data/lines.json` and `data/`.

#![forbid(unsafe_code)]

use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use geoquiz_back::{
    dao::reference::{load_lines, write_matrix},
    state::network::MetroNetwork,
};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let lines_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/lines.json"));
    let out_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let lines = load_lines(&lines_path)
        .with_context(|| format!("reading lines from {}", lines_path.display()))?;
    let network = MetroNetwork::new(&lines);
    let (stops, transfers) = network.matrices();

    let stops_path = out_dir.join("min_stops.csv");
    let transfers_path = out_dir.join("min_transfers.csv");
    write_matrix(&stops_path, &stops).context("writing stops table")?;
    write_matrix(&transfers_path, &transfers).context("writing transfers table")?;

    println!(
        "{} lines, {} stations",
        lines.len(),
        network.stations().len()
    );
    println!("  {}", stops_path.display());
    println!("  {}", transfers_path.display());
    Ok(())
}
