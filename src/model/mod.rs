//! Data models for the labeling tool.

mod keypoint;
mod schema;

pub use keypoint::{EdgeSegment, GraphSummary, Keypoint, KeypointGraph, Properties, Property};
pub use schema::{
    EdgeColor, KeypointSchemaEntry, PropertySchema, PropertyType, PropertyValue, Schema,
    SchemaError,
};
