mod sketch;

pub use sketch::{Sketch, SketchCollection, SketchInput, SketchProperties, UserAttribute};
