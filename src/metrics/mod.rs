mod histogram;
mod sink;

pub use histogram::LatencyHistogram;
pub use sink::{ResultSink, SinkHandle};
