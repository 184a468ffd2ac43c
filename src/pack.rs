//! Scan-based compaction of distributed arrays
//!
//! Packing removes unselected elements and repacks the survivors
//! contiguously, preserving their original global order, without ever
//! materializing a whole array on one rank. Destinations come from prefix
//! sums: a local exclusive scan gives each surviving element its rank-local
//! ordinal, an exclusive scan of the per-rank survivor counts gives each rank
//! its global base, and their sum is the element's destination index. Bases
//! are strictly increasing, so writes from different ranks target disjoint
//! ranges and the only synchronization needed is the barrier that ends the
//! episode.

use crate::array::{DataType, DistributedArray, Element};
use crate::comm::group_abort;
use crate::errors::{Result, SubsetError};
use crate::mask::MaskHandle;

/// Exclusive prefix sum of a distributed 1-D integer array: `out[i]` is the
/// sum of `src[0..i]` across the whole logical array. Collective.
pub fn exclusive_prefix_sum(src: &DistributedArray<i32>) -> Result<DistributedArray<i64>> {
    if src.shape().len() != 1 {
        return Err(SubsetError::ShapeMismatch {
            message: format!("prefix sum supports 1-D arrays, got shape {:?}", src.shape()),
        });
    }
    // destination type must be at least as wide as the source
    debug_assert!(DataType::promote(DataType::Int, DataType::Int64) == DataType::Int64);
    let out = DistributedArray::zeros(src.group(), src.shape().to_vec())?;
    src.group().run(|comm| {
        let rank = comm.rank();
        let values = src.local_patch(rank);
        let mut dst = out.local_patch_mut(rank);
        let mut running: i64 = 0;
        for (d, &v) in dst.iter_mut().zip(values.iter()) {
            *d = running;
            running += v as i64;
        }
        let (base, _total) = comm.exclusive_scan(running);
        for d in dst.iter_mut() {
            *d += base;
        }
    });
    Ok(out)
}

/// N-dimensional mask-driven subset of a distributed array.
///
/// `masks` pairs one optional mask with each axis of `src`; `None` keeps an
/// axis whole. The leading axis is compacted with the distributed prefix-sum
/// algorithm above. Trailing axes are small (the leading axis carries the
/// record dimension), so their flag vectors are materialized locally and
/// folded into a per-row element selection.
pub fn pack<T: Element>(
    src: &DistributedArray<T>,
    masks: &[Option<MaskHandle<'_>>],
) -> Result<DistributedArray<T>> {
    let shape = src.shape();
    if masks.len() != shape.len() {
        return Err(SubsetError::ShapeMismatch {
            message: format!(
                "{} masks supplied for an array of {} dimensions",
                masks.len(),
                shape.len()
            ),
        });
    }
    for (axis, mask) in masks.iter().enumerate() {
        if let Some(handle) = mask {
            if handle.flags.shape() != [shape[axis]] {
                return Err(SubsetError::ShapeMismatch {
                    message: format!(
                        "mask of shape {:?} applied to axis {} of extent {}",
                        handle.flags.shape(),
                        axis,
                        shape[axis]
                    ),
                });
            }
            if !src.same_group(handle.flags) {
                return Err(SubsetError::GroupError(
                    "mask lives on a different worker group than the array".to_string(),
                ));
            }
        }
    }

    let dest_shape: Vec<i64> = shape
        .iter()
        .zip(masks.iter())
        .map(|(&extent, mask)| mask.as_ref().map_or(extent, |h| h.count))
        .collect();

    // Per-row offsets of the surviving trailing elements, in row-major order.
    let row_offsets = trailing_offsets(shape, masks);
    let dest = DistributedArray::zeros(src.group(), dest_shape)?;
    let dest_rows = dest.shape()[0];

    src.group().run(|comm| {
        let rank = comm.rank();
        let dist = src.dist();
        let lo = dist.lo(rank);
        let rows = dist.local_len(rank);

        // rank-local survivors of the leading axis, in order
        let selected: Vec<i64> = match &masks[0] {
            Some(handle) => {
                let flags = handle.flags.local_patch(rank);
                (0..rows).filter(|&i| flags[i as usize] != 0).collect()
            }
            None => (0..rows).collect(),
        };

        let (base, total) = comm.exclusive_scan(selected.len() as i64);
        if total != dest_rows {
            // the mask mutated between its count and this pack
            group_abort("pack: selected row total does not match destination size");
        }

        let patch = src.local_patch(rank);
        let row_len = src.row_len() as usize;
        let mut row_buf: Vec<T> = Vec::with_capacity(row_offsets.len());
        for (ordinal, &local_row) in selected.iter().enumerate() {
            let row = &patch[local_row as usize * row_len..(local_row as usize + 1) * row_len];
            row_buf.clear();
            row_buf.extend(row_offsets.iter().map(|&off| row[off as usize]));
            dest.put_row(base + ordinal as i64, &row_buf);
        }
        drop(patch);

        // puts must complete on every rank before the result is readable
        comm.barrier();
    });

    Ok(dest)
}

impl<T: Element> DistributedArray<T> {
    /// Compact this array along its leading axis, keeping the elements the
    /// mask selects, in their original order, repartitioned evenly.
    pub fn reindex(&self, mask: &mut crate::mask::Mask) -> Result<DistributedArray<T>> {
        let mut masks: Vec<Option<MaskHandle<'_>>> = vec![None; self.shape().len()];
        masks[0] = Some(mask.handle());
        pack(self, &masks)
    }
}

/// Row-major offsets within one leading-axis row that survive the trailing
/// masks. With no trailing masks this is simply `0..row_len`.
fn trailing_offsets(shape: &[i64], masks: &[Option<MaskHandle<'_>>]) -> Vec<i64> {
    let mut offsets: Vec<i64> = vec![0];
    for axis in 1..shape.len() {
        let stride: i64 = shape[axis + 1..].iter().product();
        let kept: Vec<i64> = match &masks[axis] {
            Some(handle) => handle
                .flags
                .to_vec()
                .iter()
                .enumerate()
                .filter(|(_, &f)| f != 0)
                .map(|(i, _)| i as i64)
                .collect(),
            None => (0..shape[axis]).collect(),
        };
        let mut next = Vec::with_capacity(offsets.len() * kept.len());
        for &base in &offsets {
            for &k in &kept {
                next.push(base + k * stride);
            }
        }
        offsets = next;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::ProcessGroup;
    use crate::mask::Mask;
    use crate::slice::DimSlice;
    use std::sync::Arc;

    fn group(n: usize) -> Arc<ProcessGroup> {
        Arc::new(ProcessGroup::new(n).expect("group"))
    }

    fn mask_from_flags(g: &Arc<ProcessGroup>, name: &str, flags: &[i32]) -> Mask {
        let mut mask = Mask::create(g, name, flags.len() as i64).expect("mask");
        mask.clear();
        for (i, &f) in flags.iter().enumerate() {
            if f != 0 {
                mask.modify_slice(&DimSlice::index(name, i as i64)).expect("set bit");
            }
        }
        mask
    }

    #[test]
    fn exclusive_prefix_sum_spans_ranks() {
        for nprocs in [1, 2, 3, 4] {
            let g = group(nprocs);
            let src =
                DistributedArray::from_vec(&g, vec![6], vec![1, 0, 1, 1, 0, 1]).expect("src");
            let sums = exclusive_prefix_sum(&src).expect("scan");
            assert_eq!(sums.to_vec(), vec![0, 1, 1, 2, 3, 3]);
        }
    }

    #[test]
    fn reindex_keeps_selected_elements_in_order() {
        for nprocs in [1, 2, 3, 4] {
            let g = group(nprocs);
            let src = DistributedArray::from_vec(
                &g,
                vec![5],
                vec![10.0, 20.0, 30.0, 40.0, 50.0],
            )
            .expect("src");
            let mut mask = mask_from_flags(&g, "d", &[0, 1, 0, 1, 1]);
            let packed = pack(&src, &[Some(mask.handle())]).expect("pack");
            assert_eq!(packed.shape(), &[3]);
            assert_eq!(packed.to_vec(), vec![20.0, 40.0, 50.0]);
        }
    }

    #[test]
    fn reindex_on_a_two_dimensional_array() {
        let g = group(3);
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let src = DistributedArray::from_vec(&g, vec![5, 2], values).expect("src");
        let mut mask = mask_from_flags(&g, "rows", &[0, 1, 0, 1, 1]);
        let packed = src.reindex(&mut mask).expect("reindex");
        assert_eq!(packed.shape(), &[3, 2]);
        assert_eq!(packed.to_vec(), vec![2.0, 3.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn empty_mask_yields_zero_length_array() {
        let g = group(3);
        let src =
            DistributedArray::from_vec(&g, vec![4], vec![1.0, 2.0, 3.0, 4.0]).expect("src");
        let mut mask = Mask::create(&g, "d", 4).expect("mask");
        mask.clear();
        let packed = pack(&src, &[Some(mask.handle())]).expect("pack");
        assert_eq!(packed.shape(), &[0]);
        assert!(packed.to_vec().is_empty());
    }

    #[test]
    fn full_mask_is_a_copy() {
        let g = group(2);
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let src = DistributedArray::from_vec(&g, vec![6, 2], values.clone()).expect("src");
        let mut mask = Mask::create(&g, "d", 6).expect("mask");
        let packed = pack(&src, &[Some(mask.handle()), None]).expect("pack");
        assert_eq!(packed.shape(), &[6, 2]);
        assert_eq!(packed.to_vec(), values);
    }

    #[test]
    fn trailing_masks_compact_within_rows() {
        let g = group(2);
        // 3 x 4 array, keep rows {0, 2} and columns {1, 3}
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let src = DistributedArray::from_vec(&g, vec![3, 4], values).expect("src");
        let mut row_mask = mask_from_flags(&g, "rows", &[1, 0, 1]);
        let mut col_mask = mask_from_flags(&g, "cols", &[0, 1, 0, 1]);
        let packed =
            pack(&src, &[Some(row_mask.handle()), Some(col_mask.handle())]).expect("pack");
        assert_eq!(packed.shape(), &[2, 2]);
        assert_eq!(packed.to_vec(), vec![1.0, 3.0, 9.0, 11.0]);
    }

    #[test]
    fn mask_count_mismatch_is_rejected() {
        let g = group(2);
        let src =
            DistributedArray::from_vec(&g, vec![4], vec![1.0, 2.0, 3.0, 4.0]).expect("src");
        let mut mask = Mask::create(&g, "other", 6).expect("mask");
        assert!(matches!(
            pack(&src, &[Some(mask.handle())]),
            Err(SubsetError::ShapeMismatch { .. })
        ));
    }
}
