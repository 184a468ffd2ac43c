//! Per-dataset registry of dimension masks
//!
//! A [`MaskMap`] owns exactly one [`Mask`] per dimension of its dataset,
//! created lazily as all-selected on first access and mutated in place from
//! then on, so every variable sharing a dimension observes the same
//! selection. The first restriction applied to a dimension clears its mask;
//! later restrictions accumulate (union of the selected sets).

use crate::comm::ProcessGroup;
use crate::dimension::Dimension;
use crate::errors::Result;
use crate::geobox::LatLonBox;
use crate::mask::Mask;
use crate::slice::DimSlice;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct MaskMap {
    group: Arc<ProcessGroup>,
    masks: HashMap<String, Mask>,
    cleared: HashSet<String>,
}

impl MaskMap {
    pub fn new(group: &Arc<ProcessGroup>) -> Self {
        Self {
            group: Arc::clone(group),
            masks: HashMap::new(),
            cleared: HashSet::new(),
        }
    }

    /// The mask for a dimension, creating a default all-selected mask on
    /// first access. Repeated calls for the same dimension return the same
    /// instance.
    pub fn get_mask(&mut self, dim: &Dimension) -> Result<&mut Mask> {
        match self.masks.entry(dim.name().to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mask = Mask::create_for(&self.group, dim)?;
                Ok(entry.insert(mask))
            }
        }
    }

    /// Whether a mask already exists for the named dimension.
    pub fn has_mask(&self, name: &str) -> bool {
        self.masks.contains_key(name)
    }

    /// Read-only view of an existing mask.
    pub fn find_mask(&self, name: &str) -> Option<&Mask> {
        self.masks.get(name)
    }

    /// Mutable view of an existing mask.
    pub fn find_mask_mut(&mut self, name: &str) -> Option<&mut Mask> {
        self.masks.get_mut(name)
    }

    /// Apply one slice restriction to the named dimension's mask, clearing
    /// the mask first if this is the first restriction on that dimension.
    pub fn modify_slice(&mut self, slice: &DimSlice, dim: &Dimension) -> Result<()> {
        debug_assert_eq!(slice.name(), dim.name());
        let first = self.cleared.insert(dim.name().to_string());
        let mask = self.get_mask(dim)?;
        if first {
            mask.clear();
        }
        mask.modify_slice(slice)
    }

    /// Apply a coordinate-range restriction (rectilinear grids).
    pub fn modify_range(
        &mut self,
        min: f64,
        max: f64,
        dim: &Dimension,
        coord: &crate::array::DistributedArray<f64>,
    ) -> Result<()> {
        let first = self.cleared.insert(dim.name().to_string());
        let mask = self.get_mask(dim)?;
        if first {
            mask.clear();
        }
        mask.modify_range(min, max, coord)
    }

    /// Apply a lat/lon box restriction to a shared cell dimension (geodesic
    /// grids, one coordinate pair per element).
    pub fn modify_box(
        &mut self,
        bbox: &LatLonBox,
        dim: &Dimension,
        lat: &crate::array::DistributedArray<f64>,
        lon: &crate::array::DistributedArray<f64>,
    ) -> Result<()> {
        let first = self.cleared.insert(dim.name().to_string());
        let mask = self.get_mask(dim)?;
        if first {
            mask.clear();
        }
        mask.modify_box(bbox, lat, lon)
    }
}
