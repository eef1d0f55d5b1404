/*!
 * Monitoring
 * Pool metrics and structured tracing
 */

mod metrics;
mod tracer;

pub use metrics::{AtomicPoolMetrics, Metrics};
pub use tracer::{init_tracing, run_span, TRACE_JSON_VAR};
