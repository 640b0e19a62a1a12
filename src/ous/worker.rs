use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use geo::{BoundingRect, Intersects, MultiPolygon, Rect};
use tracing::{debug, warn};

use crate::config::ReportConfig;
use crate::geom::{ensure_finite, union_all};
use crate::ous::{
    community_class_id, format_community_name, OusStats, RespondentShape, ShardRange, ShardResult,
    UNKNOWN_COMMUNITY, UNKNOWN_GEAR, UNKNOWN_SECTOR,
};
use crate::sketch::SketchInput;

/// Survey-specific settings for the shard worker.
#[derive(Debug, Clone)]
pub struct SurveyOptions {
    /// Region prefixes stripped from normalized community names.
    pub community_regions: Vec<String>,
}

impl Default for SurveyOptions {
    fn default() -> Self { Self::from_config(&ReportConfig::default()) }
}

impl SurveyOptions {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self { community_regions: config.community_regions.clone() }
    }
}

/// Gears and sectors already credited for one respondent.
#[derive(Default)]
struct Credited {
    gears: AHashSet<String>,
    sectors: AHashSet<String>,
}

/// The union of a sketch's parts, for shape filtering. Built once per run and
/// shared by every shard.
pub(super) struct SketchFilter {
    sketch_id: String,
    union: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl SketchFilter {
    pub(super) fn new(sketch: &SketchInput) -> Result<Self> {
        for child in sketch.sketches() {
            ensure_finite(&child.geometry, &format!("sketch {}", child.id()))?;
        }
        let union = union_all(&sketch.geometries());
        let bounds = union.bounding_rect();
        Ok(Self { sketch_id: sketch.id().to_string(), union, bounds })
    }

    fn overlaps(&self, shape: &RespondentShape) -> Result<bool> {
        let Some(bounds) = self.bounds else { return Ok(false) };
        ensure_finite(&shape.geometry, "survey shape")?;
        match shape.geometry.bounding_rect() {
            Some(rect) if rect.intersects(&bounds) => Ok(shape.geometry.intersects(&self.union)),
            _ => Ok(false),
        }
    }
}

/// Compute survey stats for the shapes whose respondent id falls in `range`.
///
/// With a sketch, only shapes intersecting the union of its parts count.
/// Each respondent is counted once overall and once per community, and once
/// per distinct gear and sector they reported. Shapes missing `resp_id` or a
/// usable `number_of_ppl` are logged and skipped; corrupt geometry aborts.
pub fn compute_shard_stats(
    shapes: &[RespondentShape],
    range: ShardRange,
    sketch: Option<&SketchInput>,
    options: &SurveyOptions,
) -> Result<ShardResult> {
    let filter = sketch.map(SketchFilter::new).transpose()?;
    filtered_shard_stats(shapes, range, filter.as_ref(), options)
}

/// Shard stats with an already built sketch filter.
pub(super) fn filtered_shard_stats(
    shapes: &[RespondentShape],
    range: ShardRange,
    filter: Option<&SketchFilter>,
    options: &SurveyOptions,
) -> Result<ShardResult> {
    let mut credited: AHashMap<u64, Credited> = AHashMap::new();
    let mut stats = OusStats::default();
    let mut skipped = 0usize;

    for (idx, shape) in shapes.iter().enumerate() {
        let (Some(resp_id), Some(people)) = (shape.resp_id(), shape.people()) else {
            // Out-of-range shapes belong to another shard; only report our own.
            if shape.resp_id().is_none_or(|id| range.contains(id)) {
                warn!(shape = idx, properties = ?shape.properties, "shape missing resp_id or number_of_ppl, skipping");
                skipped += 1;
            }
            continue;
        };
        if !range.contains(resp_id) { continue }

        if let Some(filter) = filter {
            if !filter.overlaps(shape)? { continue }
        }

        let respondent = match credited.entry(resp_id) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                stats.respondents += 1;
                stats.people += people;

                match shape.communities() {
                    Some(communities) => for community in communities {
                        let name = format_community_name(community);
                        let class_id = community_class_id(&name, &options.community_regions);
                        OusStats::credit(&mut stats.by_community, &class_id, shape.community_people(&name));
                    },
                    None => OusStats::credit(&mut stats.by_community, UNKNOWN_COMMUNITY, 1.0),
                }

                entry.insert(Credited::default())
            }
        };

        let gears = shape.gears().unwrap_or_else(|| vec![UNKNOWN_GEAR]);
        for gear in gears {
            if respondent.gears.insert(gear.to_string()) {
                OusStats::credit(&mut stats.by_gear, gear, people);
            }
        }

        let sector = shape.sector().unwrap_or(UNKNOWN_SECTOR);
        if respondent.sectors.insert(sector.to_string()) {
            OusStats::credit(&mut stats.by_sector, sector, people);
        }
    }

    debug!(start = range.start, end = range.end, respondents = stats.respondents, skipped, "shard done");
    Ok(ShardResult::from_stats(stats, filter.map(|filter| filter.sketch_id.as_str())))
}
