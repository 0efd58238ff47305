use std::fmt;

use foundation::{Extent, Id};
use serde::{Deserialize, Serialize};

use crate::filters::Filters;

/// Server zoom buckets are integral: round to nearest, halves away from zero,
/// and clamp into the `u8` range the API accepts.
pub fn round_zoom(zoom_level: f64) -> u8 {
    if zoom_level.is_nan() {
        return 0;
    }
    zoom_level.round().clamp(0.0, u8::MAX as f64) as u8
}

/// `POST /api/map/view`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub zoom_level: u8,
    pub family_id: Id,
    #[serde(flatten)]
    pub filters: Filters,
}

impl ViewRequest {
    pub fn new(extent: Extent, zoom_level: f64, family_id: Id, filters: Filters) -> Self {
        Self {
            xmin: extent.xmin,
            ymin: extent.ymin,
            xmax: extent.xmax,
            ymax: extent.ymax,
            zoom_level: round_zoom(zoom_level),
            family_id,
            filters,
        }
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl fmt::Display for ViewRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ViewRequest {{ xmin: {}, ymin: {}, xmax: {}, ymax: {}, zoom_level: {}, family_id: {} }}",
            self.xmin, self.ymin, self.xmax, self.ymax, self.zoom_level, self.family_id
        )
    }
}

/// An entity as returned by a viewport query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerCachedEntity {
    pub id: Id,
    pub entity_id: Id,
    pub family_id: Id,
    pub category_id: Id,
    #[serde(default)]
    pub tags_ids: Vec<Id>,
    pub display_name: String,
    pub web_mercator_x: f64,
    pub web_mercator_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Id,
    pub center_x: f64,
    pub center_y: f64,
    pub count: u64,
}

/// Complete replacement set for one viewport query; never a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitiesAndClusters {
    pub entities: Vec<ViewerCachedEntity>,
    pub clusters: Vec<Cluster>,
}
