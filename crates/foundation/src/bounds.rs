use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in the map's projected coordinate system.
///
/// Ordering follows the usual map-library convention: `[xmin, ymin, xmax, ymax]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Extent {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn from_array(e: [f64; 4]) -> Self {
        Extent::new(e[0], e[1], e[2], e[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// True when all corners are finite and min <= max on both axes.
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

impl From<[f64; 4]> for Extent {
    fn from(e: [f64; 4]) -> Self {
        Extent::from_array(e)
    }
}
