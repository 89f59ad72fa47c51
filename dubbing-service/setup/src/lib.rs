mod app;
mod wiring;

pub use app::{build_and_run, Application};
pub use wiring::{build_pipeline, build_rate_limiter, job_settings, PipelinePorts};
