//! Dimension slice specifications
//!
//! A [`DimSlice`] is the parsed form of the `-d name,start[,stop[,step]]`
//! command-line mini-grammar. `start` and `stop` may be negative (counted
//! from the end of the dimension); `stop` is exclusive and defaults to
//! `start + 1`, so `"time,7"` selects exactly index 7.

use crate::errors::{Result, SubsetError};
use std::str::FromStr;

/// Index-range restriction on one named dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimSlice {
    name: String,
    start: i64,
    stop: Option<i64>,
    step: Option<i64>,
}

impl DimSlice {
    pub fn new(name: impl Into<String>, start: i64, stop: i64, step: i64) -> Self {
        Self {
            name: name.into(),
            start,
            stop: Some(stop),
            step: Some(step),
        }
    }

    /// Single-index slice, `"name,start"`.
    pub fn index(name: impl Into<String>, start: i64) -> Self {
        Self {
            name: name.into(),
            start,
            stop: None,
            step: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the slice against a dimension of the given size, returning
    /// concrete `(start, stop, step)` with negative indices normalized.
    ///
    /// Examples for size 20:
    /// - `"dim,1,5,2"`  -> (1, 5, 2)
    /// - `"dim,1,2"`    -> (1, 2, 1)
    /// - `"dim,7"`      -> (7, 8, 1)
    /// - `"dim,-1"`     -> (19, 20, 1)
    pub fn indices(&self, size: i64) -> Result<(i64, i64, i64)> {
        if size < 0 {
            return Err(SubsetError::InvalidSlice {
                message: "dimension size must be non-negative".to_string(),
            });
        }

        let mut start = self.start;
        if start < 0 {
            start += size;
        }
        if start < 0 || start > size {
            return Err(SubsetError::InvalidSlice {
                message: format!(
                    "start index {} out of range for dimension '{}' of size {}",
                    self.start, self.name, size
                ),
            });
        }

        let stop = match self.stop {
            Some(raw) => {
                let mut stop = raw;
                if stop < 0 {
                    stop += size;
                }
                if stop < 0 || stop > size {
                    return Err(SubsetError::InvalidSlice {
                        message: format!(
                            "stop index {} out of range for dimension '{}' of size {}",
                            raw, self.name, size
                        ),
                    });
                }
                stop
            }
            None => {
                // single-index form: the index itself must exist
                if start >= size {
                    return Err(SubsetError::InvalidSlice {
                        message: format!(
                            "index {} out of range for dimension '{}' of size {}",
                            self.start, self.name, size
                        ),
                    });
                }
                start + 1
            }
        };

        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(SubsetError::InvalidSlice {
                message: "step must be non-zero".to_string(),
            });
        }
        if start > stop && step > 0 {
            return Err(SubsetError::InvalidSlice {
                message: format!("start {} > stop {} with positive step", start, stop),
            });
        }
        if start < stop && step < 0 {
            return Err(SubsetError::InvalidSlice {
                message: format!("start {} < stop {} with negative step", start, stop),
            });
        }

        Ok((start, stop, step))
    }
}

impl FromStr for DimSlice {
    type Err = SubsetError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(SubsetError::InvalidSlice {
                message: format!("expected 'name,start[,stop[,step]]', got '{}'", s),
            });
        }

        let parse = |what: &str, text: &str| -> Result<i64> {
            text.trim().parse::<i64>().map_err(|_| SubsetError::InvalidSlice {
                message: format!("invalid {} '{}' in '{}'", what, text, s),
            })
        };

        let name = parts[0].trim();
        if name.is_empty() {
            return Err(SubsetError::InvalidSlice {
                message: format!("empty dimension name in '{}'", s),
            });
        }
        let start = parse("start", parts[1])?;
        let stop = if parts.len() > 2 {
            Some(parse("stop", parts[2])?)
        } else {
            None
        };
        let step = if parts.len() > 3 {
            Some(parse("step", parts[3])?)
        } else {
            None
        };

        Ok(Self {
            name: name.to_string(),
            start,
            stop,
            step,
        })
    }
}
