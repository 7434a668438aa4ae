pub mod records;
pub mod sink;

pub use records::*;
pub use sink::AnalyticsSink;
