use std::sync::OnceLock;

use geo::MultiPolygon;
use regex::Regex;
use serde_json::{Map, Value};

/// One ocean-use shape drawn by a survey respondent.
///
/// A respondent usually draws many shapes, all sharing the same `resp_id`.
/// Per-community people counts live in extra properties keyed by the
/// normalized community name.
#[derive(Debug, Clone)]
pub struct RespondentShape {
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

impl RespondentShape {
    pub fn new(properties: Map<String, Value>, geometry: MultiPolygon<f64>) -> Self {
        Self { properties, geometry }
    }

    /// Respondent id, from a number or a numeric string.
    pub fn resp_id(&self) -> Option<u64> {
        match self.properties.get("resp_id")? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|v| v.fract() == 0.0 && *v >= 0.0).map(|v| v as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Number of people the respondent represents.
    pub fn people(&self) -> Option<f64> {
        self.properties.get("number_of_ppl").and_then(parse_people_count)
    }

    /// Per-community people count stored under the normalized community name.
    /// Defaults to 1 when absent.
    pub fn community_people(&self, community_name: &str) -> f64 {
        self.properties.get(community_name).and_then(parse_people_count).unwrap_or(1.0)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Communities listed on the shape (comma-separated), if any.
    pub fn communities(&self) -> Option<Vec<&str>> { self.text("community").map(split_list) }

    pub fn sector(&self) -> Option<&str> { self.text("sector") }

    /// Gear types listed on the shape (comma-separated), if any.
    pub fn gears(&self) -> Option<Vec<&str>> { self.text("gear").map(split_list) }
}

/// People counts may be numbers or numeric strings; anything else is unusable.
fn parse_people_count(value: &Value) -> Option<f64> {
    let count = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    count.filter(|v| v.is_finite())
}

fn split_list(value: &str) -> Vec<&str> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*").expect("valid regex"));
    separator.split(value).filter(|s| !s.is_empty()).collect()
}

/// Normalize a community name into a property/class key: lower-case, with
/// runs of dashes, whitespace, periods and apostrophes replaced by `_`.
pub fn format_community_name(community: &str) -> String {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    let punctuation = PUNCTUATION.get_or_init(|| Regex::new(r"[-\s.'’]+").expect("valid regex"));
    punctuation.replace_all(&community.to_lowercase(), "_").into_owned()
}

/// Class id for a normalized community name: the first matching region prefix is stripped.
pub fn community_class_id(community_name: &str, regions: &[String]) -> String {
    regions.iter()
        .find_map(|region| community_name.strip_prefix(region.as_str()))
        .unwrap_or(community_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shape(properties: Value) -> RespondentShape {
        let Value::Object(map) = properties else { panic!("expected object") };
        RespondentShape::new(map, MultiPolygon::new(vec![]))
    }

    #[test]
    fn format_is_case_and_punctuation_insensitive() {
        assert_eq!(format_community_name("Belize City"), format_community_name("belize city"));
        assert_eq!(format_community_name("Belize City"), "belize_city");
        assert_eq!(format_community_name("St. George's  Caye"), "st_george_s_caye");
        assert_eq!(format_community_name("Hopkins-Sittee"), "hopkins_sittee");
        assert_eq!(format_community_name("Placencia’s"), "placencia_s");
    }

    #[test]
    fn region_prefix_is_stripped() {
        let regions = vec!["belize_".to_string(), "toledo_".to_string()];
        assert_eq!(community_class_id("belize_city", &regions), "city");
        assert_eq!(community_class_id("toledo_punta_gorda", &regions), "punta_gorda");
        assert_eq!(community_class_id("hopkins", &regions), "hopkins");
        assert_eq!(
            community_class_id(&format_community_name("Belize City"), &regions),
            community_class_id(&format_community_name("belize city"), &regions),
        );
    }

    #[test]
    fn parses_fields() {
        let s = shape(json!({
            "resp_id": "6012",
            "number_of_ppl": "3",
            "community": "Belize City , Hopkins",
            "gear": "longline,handline",
            "sector": "",
            "belize_city": 2,
        }));
        assert_eq!(s.resp_id(), Some(6012));
        assert_eq!(s.people(), Some(3.0));
        assert_eq!(s.communities(), Some(vec!["Belize City", "Hopkins"]));
        assert_eq!(s.gears(), Some(vec!["longline", "handline"]));
        assert_eq!(s.sector(), None);
        assert_eq!(s.community_people("belize_city"), 2.0);
        assert_eq!(s.community_people("hopkins"), 1.0);
    }

    #[test]
    fn missing_or_bad_counts() {
        assert_eq!(shape(json!({"resp_id": 7})).people(), None);
        assert_eq!(shape(json!({"number_of_ppl": "many"})).people(), None);
        assert_eq!(shape(json!({"number_of_ppl": null})).people(), None);
        assert_eq!(shape(json!({"resp_id": null})).resp_id(), None);
        assert_eq!(shape(json!({"resp_id": 12.0})).resp_id(), Some(12));
    }
}
