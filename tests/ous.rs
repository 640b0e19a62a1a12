use geo::{polygon, MultiPolygon};
use openmpa::survey::{
    compute_shard_stats, format_community_name, merge_shard_results, run_sharded, verify_respondent_total,
    RespondentShape, ShardRange, ShardResult, SurveyOptions,
};
use openmpa::{Sketch, SketchInput, SketchProperties};
use serde_json::{json, Value};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
}

fn shape(properties: Value, x: f64) -> RespondentShape {
    RespondentShape::new(properties.as_object().cloned().unwrap_or_default(), rect(x, 0.0, x + 1.0, 1.0))
}

/// Survey with respondents spread over ids 0..=300, several shapes each.
fn survey() -> Vec<RespondentShape> {
    let gears = ["longline", "handline", "trap"];
    (0..=300u64)
        .step_by(7)
        .flat_map(|id| {
            let people = 1 + id % 4;
            let sector = if id % 2 == 0 { "fishing" } else { "tourism" };
            (0..3).map(move |n| {
                let gear = gears[((id + n) % 3) as usize];
                let properties = json!({
                    "resp_id": id,
                    "number_of_ppl": people,
                    "gear": gear,
                    "sector": sector,
                    "community": "Belize City, San Pedro",
                });
                shape(properties, (id % 20) as f64)
            })
        })
        .collect()
}

fn shards() -> [ShardRange; 3] {
    [ShardRange::new(0, 100), ShardRange::new(101, 200), ShardRange::new(201, 300)]
}

#[test]
fn respondent_counted_once_per_gear() {
    let shapes = vec![
        shape(json!({"resp_id": 1, "number_of_ppl": 2, "gear": "longline"}), 0.0),
        shape(json!({"resp_id": 1, "number_of_ppl": 2, "gear": "longline"}), 1.0),
        shape(json!({"resp_id": 1, "number_of_ppl": 2, "gear": "handline"}), 2.0),
    ];
    let stats = compute_shard_stats(&shapes, ShardRange::new(0, 10), None, &SurveyOptions::default()).unwrap().stats;

    assert_eq!(stats.respondents, 1);
    assert_eq!(stats.by_gear["longline"].respondents, 1);
    assert_eq!(stats.by_gear["handline"].respondents, 1);
}

#[test]
fn merge_is_order_independent() {
    let shapes = survey();
    let options = SurveyOptions::default();
    let partials: Vec<ShardResult> = shards().iter()
        .map(|&range| compute_shard_stats(&shapes, range, None, &options).unwrap())
        .collect();

    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let merged: Vec<ShardResult> = orders.iter()
        .map(|order| merge_shard_results(order.iter().map(|&i| partials[i].clone())))
        .collect();

    for result in &merged[1..] {
        assert_eq!(result.stats, merged[0].stats);
        for metric in &result.metrics {
            let other = merged[0].metrics.iter().find(|m| m.key() == metric.key()).unwrap();
            assert_eq!(other.value, metric.value);
        }
    }
    verify_respondent_total(&merged[0], &shapes).unwrap();
}

#[test]
fn sharded_run_matches_single_shard() {
    let shapes = survey();
    let options = SurveyOptions::default();

    let sharded = run_sharded(&shapes, &shards(), None, &options).unwrap();
    let whole = compute_shard_stats(&shapes, ShardRange::new(0, 300), None, &options).unwrap();

    assert_eq!(sharded.stats, whole.stats);
    // "belize_" is a region prefix and is stripped from the class key.
    assert_eq!(sharded.stats.by_community["city"].respondents, sharded.stats.respondents);
    assert_eq!(sharded.stats.by_community["san_pedro"].respondents, sharded.stats.respondents);
}

#[test]
fn sketch_filter_limits_respondents() {
    let shapes = survey();
    let sketch: SketchInput = Sketch::new(SketchProperties::new("s", "S"), rect(0.0, 0.0, 0.5, 0.5)).into();

    let filtered = run_sharded(&shapes, &shards(), Some(&sketch), &SurveyOptions::default()).unwrap();
    let all = run_sharded(&shapes, &shards(), None, &SurveyOptions::default()).unwrap();

    assert!(filtered.stats.respondents > 0);
    assert!(filtered.stats.respondents < all.stats.respondents);
    assert!(filtered.metrics.iter().all(|m| m.sketch_id() == Some("s")));
}

#[test]
fn community_names_normalize() {
    assert_eq!(format_community_name("Belize City"), format_community_name("belize city"));
    assert_eq!(format_community_name("Belize City"), "belize_city");
}
