//! Trace data: resolution labels, the trace-file reader, and the catalog
//! that indexes loaded traces by (resolution, bitrate).

pub mod catalog;
pub mod reader;
pub mod resolution;

pub use catalog::TraceCatalog;
pub use reader::LineRecord;
pub use resolution::Resolution;
