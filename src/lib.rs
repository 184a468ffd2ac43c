//! parasub: parallel subsetting of NetCDF datasets
//!
//! A Rust library for extracting subsets of NetCDF (Network Common Data
//! Form) datasets across a group of cooperating worker threads. Subsets are
//! described per dimension, either by index slices or by a latitude/longitude
//! box, and applied to every variable of the dataset through shared selection
//! masks.
//!
//! ## Key Features
//!
//! - **Parallel Processing**: variables are block-partitioned across a Rayon
//!   worker group and compacted with distributed prefix sums
//! - **Dimension Slicing**: start/stop/step index selections, including
//!   negative indices counting from the end
//! - **Box Subsetting**: lat/lon boxes on rectilinear and geodesic grids,
//!   with wrap-around across the antimeridian
//! - **File Aggregation**: multiple inputs concatenate along the record
//!   dimension as one logical dataset
//! - **Metadata Preservation**: attributes are carried into the output file
//!
//! ## Module Organization
//!
//! - [`comm`]: the worker group and its collective operations
//! - [`array`]: block-distributed n-dimensional arrays
//! - [`mask`] / [`mask_map`]: per-dimension selection masks
//! - [`pack`]: scan-based compaction of distributed arrays
//! - [`dataset`]: NetCDF files as one logical dataset
//! - [`netcdf_io`]: subset output
//! - [`metadata`]: dataset inspection
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use parasub::prelude::*;
//! use std::sync::Arc;
//!
//! let group = Arc::new(ProcessGroup::all_cores().unwrap());
//! let mut dataset = Dataset::open(&["data.nc"], &group).unwrap();
//! dataset.adjust_masks(&["time,0,10".parse().unwrap()]).unwrap();
//! parasub::netcdf_io::write_subset(&mut dataset, "subset.nc".as_ref()).unwrap();
//! ```

// Core modules
pub mod array;
pub mod comm;
pub mod dataset;
pub mod dimension;
pub mod errors;
pub mod geobox;
pub mod mask;
pub mod mask_map;
pub mod metadata;
pub mod netcdf_io;
pub mod pack;
pub mod slice;

// Internal modules
pub mod cli;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::array::{DataType, DistributedArray, Element};
    pub use crate::comm::{BlockDist, Comm, ProcessGroup};
    pub use crate::dataset::{Dataset, VarKind};
    pub use crate::dimension::{AggregationDimension, Dimension};
    pub use crate::errors::{Result, SubsetError};
    pub use crate::geobox::LatLonBox;
    pub use crate::mask::Mask;
    pub use crate::mask_map::MaskMap;
    pub use crate::netcdf_io::SubsetWriter;
    pub use crate::slice::DimSlice;
}
