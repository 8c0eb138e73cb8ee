//! Grid cells, their footprints and the river-channel mask.

use fc_core::CellId;
use serde::{Deserialize, Serialize};

use crate::error::{FloodError, FloodResult};

/// Axis-aligned rectangle in the grid's projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Square of side `size` centred on (x, y).
    pub fn centred(x: f64, y: f64, size: f64) -> Self {
        let half = size / 2.0;
        Self::new(x - half, y - half, x + half, y + half)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn centre(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// True when `other` lies inside `self`, edges included.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }
}

/// Regression parameters for one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodCellParameters {
    pub id: CellId,
    /// Centre x
    pub x: f64,
    /// Centre y
    pub y: f64,
    /// Side length of the square cell
    pub size: f64,
    /// beta0..betaK
    pub betas: Vec<f64>,
    /// Flows below this produce zero depth
    #[serde(default)]
    pub min_q: Option<f64>,
}

impl FloodCellParameters {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::centred(self.x, self.y, self.size)
    }

    pub fn validate(&self) -> FloodResult<()> {
        let fail = |what: String| FloodError::InvalidCell { cell: self.id, what };

        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(fail(format!("centre ({}, {}) is not finite", self.x, self.y)));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(fail(format!("size must be positive, got {}", self.size)));
        }
        if self.betas.is_empty() {
            return Err(fail("no regression coefficients".to_string()));
        }
        if let Some(b) = self.betas.iter().find(|b| !b.is_finite()) {
            return Err(fail(format!("coefficient {b} is not finite")));
        }
        if let Some(q) = self.min_q
            && !q.is_finite()
        {
            return Err(fail(format!("min_q {q} is not finite")));
        }
        Ok(())
    }
}

/// River-channel polygons. Cells whose centre falls inside one are not
/// predicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMask {
    polygons: Vec<Vec<(f64, f64)>>,
}

impl ChannelMask {
    pub fn new(polygons: Vec<Vec<(f64, f64)>>) -> FloodResult<Self> {
        for (i, polygon) in polygons.iter().enumerate() {
            if polygon.len() < 3 {
                return Err(FloodError::invalid(format!(
                    "channel polygon {i} has {} vertices, at least 3 required",
                    polygon.len()
                )));
            }
        }
        Ok(Self { polygons })
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn polygons(&self) -> &[Vec<(f64, f64)>] {
        &self.polygons
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| point_in_polygon(x, y, p))
    }

    pub fn masks(&self, cell: &FloodCellParameters) -> bool {
        self.contains(cell.x, cell.y)
    }
}

/// Even-odd ray casting towards +x.
fn point_in_polygon(px: f64, py: f64, vertices: &[(f64, f64)]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: f64, y: f64) -> FloodCellParameters {
        FloodCellParameters {
            id: CellId::from_index(0),
            x,
            y,
            size: 2.0,
            betas: vec![0.0, 1.0],
            min_q: None,
        }
    }

    #[test]
    fn centred_box() {
        let b = cell(10.0, 20.0).bounding_box();
        assert_eq!(b, BoundingBox::new(9.0, 19.0, 11.0, 21.0));
        assert_eq!(b.centre(), (10.0, 20.0));
    }

    #[test]
    fn containment_includes_edges() {
        let outer = BoundingBox::new(0.0, 0.0, 4.0, 4.0);
        assert!(outer.contains_box(&BoundingBox::new(0.0, 0.0, 4.0, 4.0)));
        assert!(outer.contains_box(&BoundingBox::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!outer.contains_box(&BoundingBox::new(3.0, 3.0, 5.0, 4.0)));
    }

    #[test]
    fn mask_tests_cell_centre() {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let mask = ChannelMask::new(vec![square]).unwrap();
        assert!(mask.masks(&cell(5.0, 5.0)));
        // footprint overlaps the polygon but the centre is outside
        assert!(!mask.masks(&cell(10.5, 5.0)));
        assert!(!ChannelMask::default().masks(&cell(5.0, 5.0)));
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        assert!(ChannelMask::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]).is_err());
    }

    #[test]
    fn validation() {
        let mut c = cell(0.0, 0.0);
        assert!(c.validate().is_ok());
        c.size = 0.0;
        assert!(c.validate().is_err());
        let mut c = cell(0.0, 0.0);
        c.betas.clear();
        assert!(c.validate().is_err());
        let mut c = cell(0.0, 0.0);
        c.min_q = Some(f64::NAN);
        assert!(c.validate().is_err());
    }
}
