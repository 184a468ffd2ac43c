//! Dataset glue: NetCDF files, logical dimensions, and mask bookkeeping
//!
//! A [`Dataset`] wraps one or more NetCDF files opened as a single logical
//! dataset. With several files, same-named record dimensions are aggregated
//! join-existing style (sizes sum, variables concatenate along the record
//! axis); all non-record structure must agree between the parts. The dataset
//! owns the [`MaskMap`] for its dimensions and materializes variables as
//! distributed arrays with the current masks applied.

use crate::array::DistributedArray;
use crate::comm::ProcessGroup;
use crate::dimension::{dims_equal, AggregationDimension, Dimension};
use crate::errors::{Result, SubsetError};
use crate::geobox::LatLonBox;
use crate::mask::MaskHandle;
use crate::mask_map::MaskMap;
use crate::slice::DimSlice;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// What role a variable plays, replacing the decorator chain of deep
/// inheritance with a simple capability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Ordinary data variable.
    Data,
    /// 1-D variable named after its own dimension.
    Coordinate,
}

/// Variable metadata within a dataset.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dims: Vec<String>,
    kind: VarKind,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }
}

pub struct Dataset {
    files: Vec<netcdf::File>,
    dims: Vec<Dimension>,
    vars: Vec<Variable>,
    record: Option<String>,
    masks: MaskMap,
    group: Arc<ProcessGroup>,
}

impl Dataset {
    /// Open one or more NetCDF files as one logical dataset.
    pub fn open<P: AsRef<Path>>(paths: &[P], group: &Arc<ProcessGroup>) -> Result<Self> {
        if paths.is_empty() {
            return Err(SubsetError::Generic("no input files given".to_string()));
        }

        let first = netcdf::open(paths[0].as_ref())?;
        let mut dims = read_dims(&first);
        let vars = read_vars(&first);
        let record = dims
            .iter()
            .find(|d| d.is_unlimited())
            .map(|d| d.name().to_string());

        let mut files = vec![first];
        if paths.len() > 1 {
            let record_name = record.clone().ok_or_else(|| SubsetError::AggregationError {
                message: "aggregating multiple files requires an unlimited dimension".to_string(),
            })?;
            let record_dim = dims
                .iter()
                .find(|d| d.name() == record_name)
                .cloned()
                .ok_or_else(|| SubsetError::DimensionNotFound {
                    dim: record_name.clone(),
                })?;
            let mut agg = AggregationDimension::new(&record_dim);

            for path in &paths[1..] {
                let file = netcdf::open(path.as_ref())?;
                let part_dims = read_dims(&file);
                let part_vars = read_vars(&file);

                let part_record = part_dims
                    .iter()
                    .find(|d| d.is_unlimited())
                    .cloned()
                    .ok_or_else(|| SubsetError::AggregationError {
                        message: format!(
                            "'{}' has no unlimited dimension to aggregate along",
                            path.as_ref().display()
                        ),
                    })?;
                agg.add(&part_record)?;

                let fixed = |list: &[Dimension]| -> Vec<Dimension> {
                    list.iter().filter(|d| !d.is_unlimited()).cloned().collect()
                };
                if !dims_equal(&fixed(&dims), &fixed(&part_dims)) {
                    return Err(SubsetError::AggregationError {
                        message: format!(
                            "'{}' has differing fixed dimensions",
                            path.as_ref().display()
                        ),
                    });
                }
                if !vars_equal(&vars, &part_vars) {
                    return Err(SubsetError::AggregationError {
                        message: format!("'{}' has a differing variable list", path.as_ref().display()),
                    });
                }
                files.push(file);
            }

            for dim in dims.iter_mut() {
                if dim.name() == record_name {
                    *dim = agg.as_dimension();
                }
            }
        }

        Ok(Self {
            files,
            dims,
            vars,
            record,
            masks: MaskMap::new(group),
            group: Arc::clone(group),
        })
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    /// Name of the record (unlimited) dimension, if any.
    pub fn record_dim(&self) -> Option<&str> {
        self.record.as_deref()
    }

    pub fn find_dim(&self, name: &str) -> Option<&Dimension> {
        self.dims.iter().find(|d| d.name() == name)
    }

    pub fn find_var(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name() == name)
    }

    pub fn masks(&self) -> &MaskMap {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut MaskMap {
        &mut self.masks
    }

    pub fn group(&self) -> &Arc<ProcessGroup> {
        &self.group
    }

    /// The primary input file, for attribute copying by writers.
    pub fn input_file(&self) -> &netcdf::File {
        &self.files[0]
    }

    /// Two datasets are equal when their dimension lists and variable lists
    /// match pairwise.
    pub fn equal(&self, other: &Dataset) -> bool {
        dims_equal(&self.dims, &other.dims) && vars_equal(&self.vars, &other.vars)
    }

    /// Apply slice restrictions to the masks of the named dimensions.
    /// A slice naming an unknown dimension is reported and skipped.
    pub fn adjust_masks(&mut self, slices: &[DimSlice]) -> Result<()> {
        for slice in slices {
            match self.dims.iter().find(|d| d.name() == slice.name()).cloned() {
                Some(dim) => self.masks.modify_slice(slice, &dim)?,
                None => eprintln!("Sliced dimension '{}' does not exist", slice.name()),
            }
        }
        Ok(())
    }

    /// Apply a lat/lon box restriction using the dataset's coordinate
    /// variables. Shared-dimension (geodesic) coordinate pairs get a
    /// combined box mask; rectilinear latitude/longitude axes get range
    /// masks, with longitude wrap-around handled as a union of two ranges.
    pub fn adjust_masks_box(&mut self, bbox: &LatLonBox) -> Result<()> {
        let lat_vars = self.coordinate_candidates(is_latitude);
        let lon_vars = self.coordinate_candidates(is_longitude);
        if lat_vars.is_empty() || lon_vars.is_empty() {
            return Err(SubsetError::Generic(
                "no latitude/longitude coordinate variables found for box subsetting".to_string(),
            ));
        }

        // geodesic pairs share one cell dimension
        let mut handled = false;
        for lat_name in &lat_vars {
            for lon_name in &lon_vars {
                let (lat_dim, lon_dim) = match (
                    self.single_dim_of(lat_name),
                    self.single_dim_of(lon_name),
                ) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                if lat_dim == lon_dim {
                    let dim = self
                        .find_dim(&lat_dim)
                        .cloned()
                        .ok_or_else(|| SubsetError::DimensionNotFound { dim: lat_dim.clone() })?;
                    let lat = self.read_var_raw(lat_name)?;
                    let lon = self.read_var_raw(lon_name)?;
                    self.masks.modify_box(bbox, &dim, &lat, &lon)?;
                    handled = true;
                }
            }
        }
        if handled {
            return Ok(());
        }

        // rectilinear: latitude and longitude are independent axes
        for lat_name in &lat_vars {
            if let Some(dim_name) = self.single_dim_of(lat_name) {
                let dim = self
                    .find_dim(&dim_name)
                    .cloned()
                    .ok_or_else(|| SubsetError::DimensionNotFound { dim: dim_name.clone() })?;
                let coord = self.read_var_raw(lat_name)?;
                self.masks.modify_range(bbox.south, bbox.north, &dim, &coord)?;
            }
        }
        for lon_name in &lon_vars {
            if let Some(dim_name) = self.single_dim_of(lon_name) {
                let dim = self
                    .find_dim(&dim_name)
                    .cloned()
                    .ok_or_else(|| SubsetError::DimensionNotFound { dim: dim_name.clone() })?;
                let coord = self.read_var_raw(lon_name)?;
                if bbox.west <= bbox.east {
                    self.masks.modify_range(bbox.west, bbox.east, &dim, &coord)?;
                } else {
                    // wraps the antimeridian: union of the two half-ranges
                    self.masks
                        .modify_range(bbox.west, f64::INFINITY, &dim, &coord)?;
                    self.masks
                        .modify_range(f64::NEG_INFINITY, bbox.east, &dim, &coord)?;
                }
            }
        }
        Ok(())
    }

    /// Read a variable without masks, concatenating record slabs across the
    /// aggregated files, block-scattered across the worker group.
    pub fn read_var_raw(&self, name: &str) -> Result<DistributedArray<f64>> {
        let var = self
            .find_var(name)
            .ok_or_else(|| SubsetError::VariableNotFound { var: name.to_string() })?
            .clone();

        let shape: Vec<i64> = var
            .dims()
            .iter()
            .map(|d| {
                self.find_dim(d)
                    .map(|dim| dim.size())
                    .ok_or_else(|| SubsetError::DimensionNotFound { dim: d.clone() })
            })
            .collect::<Result<_>>()?;

        let record_var = matches!(
            (&self.record, var.dims().first()),
            (Some(record), Some(first)) if record == first
        );

        let mut values: Vec<f64> = Vec::new();
        let sources: &[netcdf::File] = if record_var {
            &self.files
        } else {
            &self.files[..1]
        };
        for file in sources {
            let part = file
                .variable(name)
                .ok_or_else(|| SubsetError::VariableNotFound { var: name.to_string() })?;
            values.extend(part.get_values::<f64, _>(..)?);
        }

        DistributedArray::from_vec(&self.group, shape, values)
    }

    /// Read a variable with the current masks of its dimensions applied.
    pub fn read_var(&mut self, name: &str) -> Result<DistributedArray<f64>> {
        let raw = self.read_var_raw(name)?;
        let dim_names: Vec<String> = self
            .find_var(name)
            .ok_or_else(|| SubsetError::VariableNotFound { var: name.to_string() })?
            .dims()
            .to_vec();

        // resolve the counts first (collective, mutable), then borrow the
        // flag vectors immutably for the pack
        let mut counts: HashMap<String, i64> = HashMap::new();
        for dim_name in &dim_names {
            if let Some(mask) = self.masks.find_mask_mut(dim_name) {
                counts.insert(dim_name.clone(), mask.count());
            }
        }
        let handles: Vec<Option<MaskHandle<'_>>> = dim_names
            .iter()
            .map(|dim_name| {
                self.masks.find_mask(dim_name).map(|mask| MaskHandle {
                    flags: mask.flags(),
                    count: counts[dim_name],
                })
            })
            .collect();

        crate::pack::pack(&raw, &handles)
    }

    /// The reduced size of a dimension under its current mask.
    pub fn masked_size(&mut self, dim_name: &str) -> Result<i64> {
        let dim = self
            .find_dim(dim_name)
            .cloned()
            .ok_or_else(|| SubsetError::DimensionNotFound { dim: dim_name.to_string() })?;
        Ok(self.masks.get_mask(&dim)?.count())
    }

    fn single_dim_of(&self, var_name: &str) -> Option<String> {
        let var = self.find_var(var_name)?;
        if var.dims().len() == 1 {
            Some(var.dims()[0].clone())
        } else {
            None
        }
    }

    /// 1-D variables that look like the given coordinate kind, by name or by
    /// their `units` attribute.
    fn coordinate_candidates(&self, accept: fn(&str, Option<&str>) -> bool) -> Vec<String> {
        self.vars
            .iter()
            .filter(|v| v.dims().len() == 1)
            .filter(|v| {
                let units = self.units_of(v.name());
                accept(v.name(), units.as_deref())
            })
            .map(|v| v.name().to_string())
            .collect()
    }

    fn units_of(&self, var_name: &str) -> Option<String> {
        let var = self.files[0].variable(var_name)?;
        let attr = var.attribute("units")?;
        match attr.value().ok()? {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn read_dims(file: &netcdf::File) -> Vec<Dimension> {
    file.dimensions()
        .map(|d| Dimension::new(d.name(), d.len() as i64, d.is_unlimited()))
        .collect()
}

fn read_vars(file: &netcdf::File) -> Vec<Variable> {
    file.variables()
        .map(|v| {
            let dims: Vec<String> = v.dimensions().iter().map(|d| d.name().to_string()).collect();
            let kind = if dims.len() == 1 && dims[0] == v.name() {
                VarKind::Coordinate
            } else {
                VarKind::Data
            };
            Variable {
                name: v.name().to_string(),
                dims,
                kind,
            }
        })
        .collect()
}

fn vars_equal(left: &[Variable], right: &[Variable]) -> bool {
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|(l, r)| {
            l.name() == r.name() && l.dims() == r.dims() && l.kind() == r.kind()
        })
}

fn is_latitude(name: &str, units: Option<&str>) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "lat"
        || lower == "latitude"
        || lower.ends_with("_lat")
        || units.is_some_and(|u| u.starts_with("degrees_north") || u.starts_with("degree_north"))
}

fn is_longitude(name: &str, units: Option<&str>) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "lon"
        || lower == "longitude"
        || lower.ends_with("_lon")
        || units.is_some_and(|u| u.starts_with("degrees_east") || u.starts_with("degree_east"))
}
