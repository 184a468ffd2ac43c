//! Dimensions and record-dimension aggregation
//!
//! A [`Dimension`] is one named axis of a dataset. When several files are
//! opened as one logical dataset, their same-named record dimensions are
//! merged into an [`AggregationDimension`] whose size is the running sum of
//! the parts (concatenating monthly files along time, for instance).

use crate::errors::{Result, SubsetError};

/// Named, sized axis of a dataset's coordinate space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    size: i64,
    unlimited: bool,
}

impl Dimension {
    pub fn new(name: impl Into<String>, size: i64, unlimited: bool) -> Self {
        debug_assert!(size >= 0);
        Self {
            name: name.into(),
            size,
            unlimited,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }
}

/// Compare two dimension lists pairwise in order on name, size, and the
/// unlimited flag.
pub fn dims_equal(left: &[Dimension], right: &[Dimension]) -> bool {
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|(l, r)| {
            l.name() == r.name() && l.size() == r.size() && l.is_unlimited() == r.is_unlimited()
        })
}

/// A logical dimension aggregated from same-named physical dimensions of
/// several input files. Owns no storage; its size is the sum of its parts.
#[derive(Debug, Clone)]
pub struct AggregationDimension {
    name: String,
    size: i64,
    unlimited: bool,
}

impl AggregationDimension {
    /// Construct from the first physical part, copying its identity.
    pub fn new(dim: &Dimension) -> Self {
        Self {
            name: dim.name().to_string(),
            size: dim.size(),
            unlimited: dim.is_unlimited(),
        }
    }

    /// Grow the logical dimension by another physical part.
    ///
    /// Merging a dimension of a different name is rejected: the parts of one
    /// logical axis must share an identity.
    pub fn add(&mut self, dim: &Dimension) -> Result<()> {
        if dim.name() != self.name {
            return Err(SubsetError::NameMismatch {
                expected: self.name.clone(),
                found: dim.name().to_string(),
            });
        }
        self.size += dim.size();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    /// The aggregated axis as a plain [`Dimension`].
    pub fn as_dimension(&self) -> Dimension {
        Dimension::new(self.name.clone(), self.size, self.unlimited)
    }
}
