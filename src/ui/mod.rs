pub mod analyzer;
pub mod curve_generator;
pub mod geometry;

pub use analyzer::{AnalyzerControl, AnalyzerPipeline, PathConsumer};
pub use curve_generator::{AnalyzerPath, CurveGenerator, DbRange};
pub use geometry::{Point, Rect};
