//! Defines command-line interface options using `clap` for the parasub tool.

use crate::geobox::LatLonBox;
use crate::slice::DimSlice;
use clap::Parser;
use std::path::PathBuf;

/// A parallel subsetting tool for NetCDF files
#[derive(Parser, Debug)]
#[command(
    version,
    name = "parasub",
    about = "Subset and concatenate NetCDF files in parallel"
)]
pub struct Args {
    /// Input NetCDF file(s); several files aggregate along the record dimension
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Path of the subset NetCDF file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Restrict a dimension by index, formatted as <dim>,<start>[,<stop>[,<step>]].
    /// Repeatable; stop is exclusive, negative indices count from the end.
    #[arg(short = 'd', long = "dimension", value_parser = parse_dimension_arg)]
    pub dimensions: Vec<DimSlice>,

    /// Restrict by a lat/lon box, formatted as <north>,<south>,<east>,<west>
    #[arg(short = 'b', long = "box", value_parser = parse_box_arg)]
    pub bbox: Option<LatLonBox>,

    /// Number of worker threads. Defaults to number of CPU cores.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// List dimensions, variables, and global attributes, then exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_dimension_arg(s: &str) -> Result<DimSlice, String> {
    s.parse::<DimSlice>().map_err(|e| e.to_string())
}

fn parse_box_arg(s: &str) -> Result<LatLonBox, String> {
    s.parse::<LatLonBox>().map_err(|e| e.to_string())
}
