//! Cross-module tests over the whole chunking pipeline.

mod pipeline_properties;
