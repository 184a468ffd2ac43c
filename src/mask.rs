//! Per-dimension selection masks
//!
//! A [`Mask`] is a boolean selection (1 = keep) over the indices of one
//! dimension, backed by a [`DistributedArray`] so every rank can read and
//! write arbitrary indices of one logical mask. The kept-element count is
//! cached: recounting is a collective reduction over the whole group, so it
//! runs exactly once after a mutation and never on a clean mask.

use crate::array::DistributedArray;
use crate::comm::ProcessGroup;
use crate::dimension::Dimension;
use crate::errors::{Result, SubsetError};
use crate::geobox::LatLonBox;
use crate::slice::DimSlice;
use std::sync::Arc;

/// Cache state of the kept-element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountState {
    /// The selection has been mutated since the last recount.
    Stale,
    /// Cached count of kept elements.
    Valid(i64),
}

/// Selection mask over the indices of one dimension.
pub struct Mask {
    name: String,
    flags: DistributedArray<i32>,
    state: CountState,
    recounts: u64,
}

impl Mask {
    /// Create a mask of the given size with every element selected.
    pub fn create(group: &Arc<ProcessGroup>, name: impl Into<String>, size: i64) -> Result<Self> {
        let flags = DistributedArray::zeros(group, vec![size])?;
        flags.fill(1);
        Ok(Self {
            name: name.into(),
            flags,
            state: CountState::Stale,
            recounts: 0,
        })
    }

    /// Create a default mask for a dimension.
    pub fn create_for(group: &Arc<ProcessGroup>, dim: &Dimension) -> Result<Self> {
        Self::create(group, dim.name(), dim.size())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> i64 {
        self.flags.shape()[0]
    }

    /// The selection vector as a distributed integer array.
    pub fn flags(&self) -> &DistributedArray<i32> {
        &self.flags
    }

    /// Number of recount passes performed so far. A clean mask answers
    /// [`Mask::count`] without incrementing this.
    pub fn recount_invocations(&self) -> u64 {
        self.recounts
    }

    /// Number of selected elements.
    ///
    /// Collective on the first call after a mutation; cached afterwards.
    pub fn count(&mut self) -> i64 {
        if let CountState::Valid(count) = self.state {
            return count;
        }
        let totals = self.flags.group().run(|comm| {
            let patch = self.flags.local_patch(comm.rank());
            let local = patch.iter().filter(|&&f| f != 0).count() as i64;
            comm.all_reduce_sum(local)
        });
        let count = totals[0];
        self.recounts += 1;
        self.state = CountState::Valid(count);
        count
    }

    /// The cached count, or `None` when the selection has been mutated since
    /// the last recount.
    pub fn cached_count(&self) -> Option<i64> {
        match self.state {
            CountState::Valid(count) => Some(count),
            CountState::Stale => None,
        }
    }

    /// The cached count plus a borrow of the flag vector, for consumers that
    /// hold the mask immutably during a pack.
    pub fn handle(&mut self) -> MaskHandle<'_> {
        let count = self.count();
        MaskHandle {
            flags: &self.flags,
            count,
        }
    }

    /// Select every element.
    pub fn reset(&mut self) {
        self.flags.fill(1);
        // recompute on next count() even though the result is known; guards
        // against callers poking the flag vector directly
        self.state = CountState::Stale;
    }

    /// Exclude every element.
    pub fn clear(&mut self) {
        self.flags.fill(0);
        self.state = CountState::Stale;
    }

    /// Select the elements named by a slice specification. Bits are only
    /// set, never cleared, so successive slices accumulate.
    pub fn modify_slice(&mut self, slice: &DimSlice) -> Result<()> {
        let (start, stop, step) = slice.indices(self.size())?;
        // normalize a descending slice to the equivalent ascending selection
        let (sel_lo, sel_hi, stride) = if step > 0 {
            (start, stop, step)
        } else if start == stop {
            // stop stays exclusive under a negative step: 5..5 selects nothing
            return Ok(());
        } else {
            let stride = -step;
            let span = start - (stop + 1);
            (start - (span / stride) * stride, start + 1, stride)
        };
        self.state = CountState::Stale;
        self.flags.group().run(|comm| {
            let rank = comm.rank();
            let dist = self.flags.dist();
            let (lo, hi) = (dist.lo(rank), dist.hi(rank));
            let mut patch = self.flags.local_patch_mut(rank);
            let first = if sel_lo >= lo {
                sel_lo
            } else {
                sel_lo + ((lo - sel_lo + stride - 1) / stride) * stride
            };
            let mut i = first;
            while i < sel_hi.min(hi) {
                patch[(i - lo) as usize] = 1;
                i += stride;
            }
        });
        Ok(())
    }

    /// Select the elements whose coordinate value falls in `[min, max]`.
    pub fn modify_range(&mut self, min: f64, max: f64, coord: &DistributedArray<f64>) -> Result<()> {
        self.check_aligned(coord)?;
        self.state = CountState::Stale;
        self.flags.group().run(|comm| {
            let rank = comm.rank();
            let values = coord.local_patch(rank);
            let mut patch = self.flags.local_patch_mut(rank);
            for (flag, &v) in patch.iter_mut().zip(values.iter()) {
                if v >= min && v <= max {
                    *flag = 1;
                }
            }
        });
        Ok(())
    }

    /// Select the elements whose (lat, lon) coordinate pair falls inside the
    /// box. Used for geodesic grids where latitude and longitude share one
    /// dimension (one value pair per cell).
    pub fn modify_box(
        &mut self,
        bbox: &LatLonBox,
        lat: &DistributedArray<f64>,
        lon: &DistributedArray<f64>,
    ) -> Result<()> {
        self.check_aligned(lat)?;
        self.check_aligned(lon)?;
        self.state = CountState::Stale;
        self.flags.group().run(|comm| {
            let rank = comm.rank();
            let lat_vals = lat.local_patch(rank);
            let lon_vals = lon.local_patch(rank);
            let mut patch = self.flags.local_patch_mut(rank);
            for ((flag, &la), &lo) in patch.iter_mut().zip(lat_vals.iter()).zip(lon_vals.iter()) {
                if bbox.contains(la, lo) {
                    *flag = 1;
                }
            }
        });
        Ok(())
    }

    /// Exclusive prefix sum of the selection flags: for each index, the
    /// number of selected elements strictly before it. These are the
    /// destination offsets used by mask-driven compaction.
    pub fn exclusive_prefix_sum(&self) -> Result<DistributedArray<i64>> {
        crate::pack::exclusive_prefix_sum(&self.flags)
    }

    /// Enumerate the selected elements: each kept index maps to its ordinal
    /// among the kept (0, 1, 2, ...), each dropped index to -1.
    ///
    /// Mask:  0 0 1 1 0 1
    /// Map:  -1 -1 0 1 -1 2
    pub fn reindex_map(&self) -> Result<DistributedArray<i64>> {
        let sums = self.exclusive_prefix_sum()?;
        let out = DistributedArray::zeros(self.flags.group(), vec![self.size()])?;
        self.flags.group().run(|comm| {
            let rank = comm.rank();
            let flags = self.flags.local_patch(rank);
            let ordinals = sums.local_patch(rank);
            let mut dst = out.local_patch_mut(rank);
            for ((d, &f), &ord) in dst.iter_mut().zip(flags.iter()).zip(ordinals.iter()) {
                *d = if f != 0 { ord } else { -1 };
            }
        });
        Ok(out)
    }

    fn check_aligned(&self, coord: &DistributedArray<f64>) -> Result<()> {
        if !self.flags.same_group(coord) {
            return Err(SubsetError::GroupError(
                "coordinate array lives on a different worker group".to_string(),
            ));
        }
        if coord.shape() != self.flags.shape() {
            return Err(SubsetError::ShapeMismatch {
                message: format!(
                    "coordinate array shape {:?} does not match mask '{}' of size {}",
                    coord.shape(),
                    self.name,
                    self.size()
                ),
            });
        }
        Ok(())
    }
}

/// Immutable view of a mask with its count already resolved.
#[derive(Clone, Copy)]
pub struct MaskHandle<'a> {
    pub flags: &'a DistributedArray<i32>,
    pub count: i64,
}
