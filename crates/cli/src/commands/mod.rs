//! Command implementations.

mod plan;
mod run;
mod validate;

pub use plan::run_plan;
pub use run::run_recorder;
pub use validate::run_validate;
