pub mod machine;
pub mod session;
pub mod types;

pub use machine::{Effect, PostPullWorkflow, RestartDelays, WorkflowEvent, WorkflowState};
pub use session::PullSession;
pub use types::{DialogKind, PullFailure, PullOutcome, PullResult};
