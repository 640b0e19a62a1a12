#![doc = "OpenMPA public API"]
mod config;
mod error;
mod geom;
mod group;
mod io;
mod metric;
mod ous;
mod protection;
mod report;
mod sketch;

#[doc(inline)]
pub use config::{ReportConfig, HIGH_PROTECTION, MEDIUM_PROTECTION, NO_PROTECTION};

#[doc(inline)]
pub use error::ReportError;

#[doc(inline)]
pub use geom::{overlap_sketch_metrics, Geometries, OverlapOperation, PointCountOverlap, PointSet, PolygonAreaOverlap, ReferenceFeatures};

#[doc(inline)]
pub use group::{aggregate_group_metrics, flatten_by_group_all_class, verify_group_totals, GroupAggregator, GroupSummary};

#[doc(inline)]
pub use metric::{sort_metrics, to_percent_metrics, Metric, MetricKey};

#[doc(inline)]
pub use protection::{protection_counts, ProtectionClassifier};

#[doc(inline)]
pub use report::{class_overlap_report, DataClass, MetricGroup};

#[doc(inline)]
pub use sketch::{Sketch, SketchCollection, SketchInput, SketchProperties, UserAttribute};

pub mod survey {
    //! Demographic survey (OUS) aggregation over respondent id shards.
    pub use crate::ous::*;
}

pub mod geojson {
    //! GeoJSON and metrics JSON file interfaces.
    pub use crate::io::*;
}
