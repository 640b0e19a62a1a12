use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single form attribute set by the user when drawing a sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttribute {
    pub exported_id: String,
    pub value: Value,
}

/// Properties shared by sketches and sketch collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchProperties {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sketch_class_id: Option<String>,
    #[serde(default)]
    pub user_attributes: Vec<UserAttribute>,
}

impl SketchProperties {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Default::default() }
    }

    /// Look up a user attribute by exported id, rendered as a string.
    /// Missing and null attributes yield `None`.
    pub fn user_attribute(&self, exported_id: &str) -> Option<String> {
        self.user_attributes.iter()
            .find(|attr| attr.exported_id == exported_id)
            .and_then(|attr| match &attr.value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    }

    /// Set (or replace) a string user attribute.
    pub fn set_user_attribute(&mut self, exported_id: &str, value: impl Into<String>) {
        let value = Value::String(value.into());
        match self.user_attributes.iter_mut().find(|attr| attr.exported_id == exported_id) {
            Some(attr) => attr.value = value,
            None => self.user_attributes.push(UserAttribute { exported_id: exported_id.to_string(), value }),
        }
    }
}

/// A user-drawn candidate protected area.
#[derive(Debug, Clone)]
pub struct Sketch {
    pub properties: SketchProperties,
    pub geometry: MultiPolygon<f64>,
}

impl Sketch {
    pub fn new(properties: SketchProperties, geometry: MultiPolygon<f64>) -> Self {
        Self { properties, geometry }
    }

    #[inline] pub fn id(&self) -> &str { &self.properties.id }

    /// True if the sketch belongs to the given lockout sketch class.
    pub fn is_lockout(&self, lockout_class_id: &str) -> bool {
        self.properties.sketch_class_id.as_deref() == Some(lockout_class_id)
    }
}

/// A named collection of sketches.
#[derive(Debug, Clone)]
pub struct SketchCollection {
    pub properties: SketchProperties,
    pub sketches: Vec<Sketch>,
}

/// Either a single sketch or a sketch collection, as submitted for a report.
#[derive(Debug, Clone)]
pub enum SketchInput {
    Single(Sketch),
    Collection(SketchCollection),
}

impl SketchInput {
    /// Top-level properties (the sketch's own, or the collection's).
    pub fn properties(&self) -> &SketchProperties {
        match self {
            SketchInput::Single(sketch) => &sketch.properties,
            SketchInput::Collection(collection) => &collection.properties,
        }
    }

    #[inline] pub fn id(&self) -> &str { &self.properties().id }

    #[inline] pub fn name(&self) -> &str { &self.properties().name }

    #[inline] pub fn is_collection(&self) -> bool { matches!(self, SketchInput::Collection(_)) }

    /// The individual sketches: the sketch itself, or the collection's children.
    pub fn sketches(&self) -> &[Sketch] {
        match self {
            SketchInput::Single(sketch) => std::slice::from_ref(sketch),
            SketchInput::Collection(collection) => &collection.sketches,
        }
    }

    /// Look up an individual sketch by id.
    pub fn sketch(&self, id: &str) -> Option<&Sketch> {
        self.sketches().iter().find(|sketch| sketch.id() == id)
    }

    /// A report runs in lockout mode when the top-level sketch carries the lockout class.
    pub fn is_lockout(&self, lockout_class_id: &str) -> bool {
        self.properties().sketch_class_id.as_deref() == Some(lockout_class_id)
    }

    /// Geometries of all individual sketches.
    pub fn geometries(&self) -> Vec<MultiPolygon<f64>> {
        self.sketches().iter().map(|sketch| sketch.geometry.clone()).collect()
    }
}

impl From<Sketch> for SketchInput {
    fn from(sketch: Sketch) -> Self { SketchInput::Single(sketch) }
}

impl From<SketchCollection> for SketchInput {
    fn from(collection: SketchCollection) -> Self { SketchInput::Collection(collection) }
}
