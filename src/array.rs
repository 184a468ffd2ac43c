//! Block-distributed arrays
//!
//! A [`DistributedArray`] is a logically N-dimensional array whose rows
//! (leading-axis slabs) are block-partitioned across the ranks of a
//! [`ProcessGroup`]. Every element has exactly one owning rank; the union of
//! the per-rank patches covers the logical shape with no overlap. Patches sit
//! behind locks so that any rank can one-sided `put` into any patch during a
//! collective episode.

use crate::comm::{BlockDist, ProcessGroup};
use crate::errors::{Result, SubsetError};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Scalar element types of a dataset, ordered for widening conversions:
/// a value of one type can be represented by any type that compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Byte,
    Char,
    Short,
    Int,
    Int64,
    Float,
    Double,
}

impl DataType {
    /// The widest of two types, the natural result type of a mixed operation.
    pub fn promote(a: DataType, b: DataType) -> DataType {
        a.max(b)
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Byte | DataType::Char => 1,
            DataType::Short => 2,
            DataType::Int | DataType::Float => 4,
            DataType::Int64 | DataType::Double => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::Char => "char",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }
}

/// Element types storable in a [`DistributedArray`].
pub trait Element:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + std::fmt::Debug
    + std::ops::Add<Output = Self>
    + 'static
{
    const DATA_TYPE: DataType;
}

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::Byte;
}
impl Element for u8 {
    const DATA_TYPE: DataType = DataType::Char;
}
impl Element for i16 {
    const DATA_TYPE: DataType = DataType::Short;
}
impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int;
}
impl Element for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
}
impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float;
}
impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Double;
}

/// An N-dimensional array partitioned along its first axis across the ranks
/// of a worker group.
pub struct DistributedArray<T: Element> {
    shape: Vec<i64>,
    dist: BlockDist,
    row_len: i64,
    patches: Vec<RwLock<Vec<T>>>,
    group: Arc<ProcessGroup>,
}

impl<T: Element> DistributedArray<T> {
    /// Create a zero-initialized array of the given shape.
    pub fn zeros(group: &Arc<ProcessGroup>, shape: Vec<i64>) -> Result<Self> {
        if shape.is_empty() {
            return Err(SubsetError::ShapeMismatch {
                message: "array must have at least one dimension".to_string(),
            });
        }
        if shape.iter().any(|&s| s < 0) {
            return Err(SubsetError::ShapeMismatch {
                message: format!("negative extent in shape {:?}", shape),
            });
        }
        let dist = BlockDist::new(shape[0], group.nprocs());
        let row_len: i64 = shape[1..].iter().product();
        let patches = (0..group.nprocs())
            .map(|r| RwLock::new(vec![T::default(); (dist.local_len(r) * row_len) as usize]))
            .collect();
        Ok(Self {
            shape,
            dist,
            row_len,
            patches,
            group: Arc::clone(group),
        })
    }

    /// A one-element array holding a single value, usable as a constant
    /// broadcast operand in elementwise operations.
    pub fn scalar(group: &Arc<ProcessGroup>, value: T) -> Result<Self> {
        Self::from_vec(group, vec![1], vec![value])
    }

    /// Create an array from a flat row-major value buffer, scattering rows
    /// block-wise across the group.
    pub fn from_vec(group: &Arc<ProcessGroup>, shape: Vec<i64>, values: Vec<T>) -> Result<Self> {
        let array = Self::zeros(group, shape)?;
        let expected: i64 = array.shape.iter().product();
        if values.len() as i64 != expected {
            return Err(SubsetError::ShapeMismatch {
                message: format!(
                    "buffer of {} elements does not fill shape {:?} ({} elements)",
                    values.len(),
                    array.shape,
                    expected
                ),
            });
        }
        for r in 0..array.group.nprocs() {
            let start = (array.dist.lo(r) * array.row_len) as usize;
            let len = (array.dist.local_len(r) * array.row_len) as usize;
            write_lock(&array.patches[r])[..len].copy_from_slice(&values[start..start + len]);
        }
        Ok(array)
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// Total number of elements.
    pub fn len(&self) -> i64 {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Length of one leading-axis slab.
    pub fn row_len(&self) -> i64 {
        self.row_len
    }

    pub fn dist(&self) -> BlockDist {
        self.dist
    }

    pub fn group(&self) -> &Arc<ProcessGroup> {
        &self.group
    }

    /// Whether two arrays live on the same worker group.
    pub fn same_group(&self, other: &DistributedArray<impl Element>) -> bool {
        Arc::ptr_eq(&self.group, &other.group)
    }

    /// Read access to one rank's patch.
    pub fn local_patch(&self, rank: usize) -> RwLockReadGuard<'_, Vec<T>> {
        read_lock(&self.patches[rank])
    }

    /// Write access to one rank's patch.
    pub fn local_patch_mut(&self, rank: usize) -> RwLockWriteGuard<'_, Vec<T>> {
        write_lock(&self.patches[rank])
    }

    /// One-sided put of a full leading-axis row into whichever rank owns it.
    /// A row never straddles a patch boundary, so a single lock suffices.
    pub fn put_row(&self, global_row: i64, row: &[T]) {
        debug_assert_eq!(row.len() as i64, self.row_len);
        let owner = self.dist.rank_of(global_row);
        let offset = ((global_row - self.dist.lo(owner)) * self.row_len) as usize;
        let mut patch = write_lock(&self.patches[owner]);
        patch[offset..offset + row.len()].copy_from_slice(row);
    }

    /// Collective fill of every element with one value.
    pub fn fill(&self, value: T) {
        self.group.run(|comm| {
            let mut patch = write_lock(&self.patches[comm.rank()]);
            for slot in patch.iter_mut() {
                *slot = value;
            }
        });
    }

    /// Collective read of the whole array into one flat row-major buffer.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len() as usize);
        for r in 0..self.group.nprocs() {
            out.extend_from_slice(&self.local_patch(r));
        }
        out
    }

    /// Elementwise addition. Shapes must match exactly, except that a
    /// one-element operand broadcasts as a constant.
    pub fn add(&self, other: &DistributedArray<T>) -> Result<DistributedArray<T>> {
        if !self.same_group(other) {
            return Err(SubsetError::GroupError(
                "operands live on different worker groups".to_string(),
            ));
        }
        if other.len() == 1 && self.len() != 1 {
            let value = other.to_vec()[0];
            let out = Self::zeros(&self.group, self.shape.clone())?;
            self.group.run(|comm| {
                let src = self.local_patch(comm.rank());
                let mut dst = write_lock(&out.patches[comm.rank()]);
                for (d, &s) in dst.iter_mut().zip(src.iter()) {
                    *d = s + value;
                }
            });
            return Ok(out);
        }
        if self.shape != other.shape {
            return Err(SubsetError::ShapeMismatch {
                message: format!(
                    "cannot add array of shape {:?} to array of shape {:?}",
                    other.shape, self.shape
                ),
            });
        }
        let out = Self::zeros(&self.group, self.shape.clone())?;
        self.group.run(|comm| {
            let a = self.local_patch(comm.rank());
            let b = other.local_patch(comm.rank());
            let mut dst = write_lock(&out.patches[comm.rank()]);
            for ((d, &x), &y) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
                *d = x + y;
            }
        });
        Ok(out)
    }
}

pub(crate) fn read_lock<T>(lock: &RwLock<Vec<T>>) -> RwLockReadGuard<'_, Vec<T>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<Vec<T>>) -> RwLockWriteGuard<'_, Vec<T>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: usize) -> Arc<ProcessGroup> {
        Arc::new(ProcessGroup::new(n).expect("group"))
    }

    #[test]
    fn data_type_ordering_widens() {
        assert!(DataType::Byte < DataType::Short);
        assert!(DataType::Short < DataType::Int);
        assert!(DataType::Int < DataType::Float);
        assert!(DataType::Float < DataType::Double);
        assert_eq!(DataType::promote(DataType::Int, DataType::Float), DataType::Float);
        assert_eq!(DataType::promote(DataType::Double, DataType::Byte), DataType::Double);
        assert_eq!(DataType::promote(DataType::Int, DataType::Int), DataType::Int);
    }

    #[test]
    fn from_vec_round_trips_across_partitions() {
        for nprocs in [1, 2, 3, 4] {
            let g = group(nprocs);
            let values: Vec<i32> = (0..10).collect();
            let a = DistributedArray::from_vec(&g, vec![5, 2], values.clone()).expect("array");
            assert_eq!(a.to_vec(), values);
            assert_eq!(a.shape(), &[5, 2]);
            assert_eq!(a.row_len(), 2);
        }
    }

    #[test]
    fn fill_reaches_every_patch() {
        let g = group(3);
        let a: DistributedArray<f64> = DistributedArray::zeros(&g, vec![7]).expect("array");
        a.fill(2.5);
        assert_eq!(a.to_vec(), vec![2.5; 7]);
    }

    #[test]
    fn add_same_shape() {
        let g = group(2);
        let a = DistributedArray::from_vec(&g, vec![4], vec![1.0, 2.0, 3.0, 4.0]).expect("a");
        let b = DistributedArray::from_vec(&g, vec![4], vec![10.0, 20.0, 30.0, 40.0]).expect("b");
        let c = a.add(&b).expect("sum");
        assert_eq!(c.to_vec(), vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn add_broadcasts_one_element_operand() {
        let g = group(2);
        let a = DistributedArray::from_vec(&g, vec![5], vec![1.0, 2.0, 3.0, 4.0, 5.0]).expect("a");
        let c = DistributedArray::scalar(&g, 10.0).expect("scalar");
        let out = a.add(&c).expect("sum");
        assert_eq!(out.to_vec(), vec![11.0, 12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn add_rejects_shape_mismatch() {
        let g = group(2);
        let a = DistributedArray::from_vec(&g, vec![4], vec![1.0, 2.0, 3.0, 4.0]).expect("a");
        let b = DistributedArray::from_vec(&g, vec![2], vec![1.0, 2.0]).expect("b");
        match a.add(&b) {
            Err(SubsetError::ShapeMismatch { .. }) => {}
            other => panic!("expected ShapeMismatch, got {:?}", other.map(|x| x.to_vec())),
        }
    }

    #[test]
    fn zero_length_arrays_are_valid() {
        let g = group(4);
        let a: DistributedArray<f64> = DistributedArray::zeros(&g, vec![0, 3]).expect("array");
        assert_eq!(a.len(), 0);
        assert!(a.to_vec().is_empty());
    }

    #[test]
    fn put_row_targets_owning_rank() {
        let g = group(3);
        let a: DistributedArray<i32> = DistributedArray::zeros(&g, vec![5, 2]).expect("array");
        a.put_row(4, &[7, 8]);
        a.put_row(0, &[1, 2]);
        assert_eq!(a.to_vec(), vec![1, 2, 0, 0, 0, 0, 0, 0, 7, 8]);
    }
}
