//! Geographic lat/lon box specifications
//!
//! A [`LatLonBox`] restricts a dimension to the elements whose associated
//! coordinates fall inside a latitude/longitude rectangle. Parsed from the
//! `-b north,south,east,west` command-line form. Longitude handles
//! wrap-around: a box with `west > east` crosses the antimeridian.

use crate::errors::{Result, SubsetError};
use std::str::FromStr;

const RAD_PER_DEG: f64 = std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl LatLonBox {
    /// The whole globe.
    pub const GLOBAL: LatLonBox = LatLonBox {
        north: 90.0,
        south: -90.0,
        east: 180.0,
        west: -180.0,
    };

    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let b = Self {
            north,
            south,
            east,
            west,
        };
        b.check()?;
        Ok(b)
    }

    fn check(&self) -> Result<()> {
        if self.north < self.south {
            return Err(SubsetError::InvalidBox {
                message: format!("north {} is south of south {}", self.north, self.south),
            });
        }
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            return Err(SubsetError::InvalidBox {
                message: "latitude bounds must be within [-90, 90]".to_string(),
            });
        }
        Ok(())
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        self.south <= lat && lat <= self.north
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        if self.west <= self.east {
            self.west <= lon && lon <= self.east
        } else {
            // box crosses the antimeridian
            lon >= self.west || lon <= self.east
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }

    /// The same box with all bounds scaled, e.g. degree coordinates against a
    /// dataset stored in radians.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            north: self.north * factor,
            south: self.south * factor,
            east: self.east * factor,
            west: self.west * factor,
        }
    }

    /// The box in radians, for datasets whose coordinates are stored so.
    pub fn to_radians(&self) -> Self {
        self.scaled(RAD_PER_DEG)
    }
}

impl FromStr for LatLonBox {
    type Err = SubsetError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(SubsetError::InvalidBox {
                message: format!("expected 'north,south,east,west', got '{}'", s),
            });
        }
        let mut values = [0.0f64; 4];
        for (slot, text) in values.iter_mut().zip(parts.iter()) {
            *slot = text.trim().parse::<f64>().map_err(|_| SubsetError::InvalidBox {
                message: format!("invalid coordinate '{}' in '{}'", text, s),
            })?;
        }
        Self::new(values[0], values[1], values[2], values[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_north_south_east_west() {
        let b: LatLonBox = "45,-45,90,-90".parse().expect("box");
        assert_eq!(b.north, 45.0);
        assert_eq!(b.south, -45.0);
        assert_eq!(b.east, 90.0);
        assert_eq!(b.west, -90.0);
    }

    #[test]
    fn rejects_malformed_boxes() {
        assert!("45,-45,90".parse::<LatLonBox>().is_err());
        assert!("45,-45,90,x".parse::<LatLonBox>().is_err());
        // north south of south
        assert!("-45,45,90,-90".parse::<LatLonBox>().is_err());
        assert!("95,-45,90,-90".parse::<LatLonBox>().is_err());
    }

    #[test]
    fn containment_is_inclusive() {
        let b = LatLonBox::new(45.0, -45.0, 90.0, -90.0).expect("box");
        assert!(b.contains(0.0, 0.0));
        assert!(b.contains(45.0, 90.0));
        assert!(b.contains(-45.0, -90.0));
        assert!(!b.contains(46.0, 0.0));
        assert!(!b.contains(0.0, 91.0));
    }

    #[test]
    fn longitude_wraps_across_antimeridian() {
        let b = LatLonBox::new(10.0, -10.0, -170.0, 170.0).expect("box");
        assert!(b.contains_lon(175.0));
        assert!(b.contains_lon(-175.0));
        assert!(!b.contains_lon(0.0));
    }

    #[test]
    fn global_box_contains_everything() {
        assert!(LatLonBox::GLOBAL.contains(90.0, 180.0));
        assert!(LatLonBox::GLOBAL.contains(-90.0, -180.0));
    }

    #[test]
    fn radian_scaling() {
        let b = LatLonBox::new(90.0, -90.0, 180.0, -180.0).expect("box").to_radians();
        assert!((b.north - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((b.east - std::f64::consts::PI).abs() < 1e-12);
    }
}
