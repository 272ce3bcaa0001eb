pub mod session_runner;
pub mod visit_ctx;

pub use session_runner::SessionRunner;
pub use visit_ctx::VisitCtx;
