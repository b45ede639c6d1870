mod outcome;
mod traits;

pub use outcome::IterationOutcome;
pub use traits::{FnWorkUnit, WorkFuture, WorkUnit};
