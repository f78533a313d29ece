pub mod job_ctx;
pub mod job_flow;

pub use job_ctx::JobCtx;
pub use job_flow::{JobFlow, JobOutcome, JobReport};
