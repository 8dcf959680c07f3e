//! Protection-shell verification engine.
//!
//! Two halves share one [`ShellContext`]:
//!
//! - **runtime**: [`Dispatcher`] wraps every call to a satisfier declared in
//!   a [`ShellType`], snapshots its requirement variables and runs the
//!   sibling checkers of the requirements it claims.
//! - **static**: [`KnowledgeBase`] re-analyzes compilation units, keeps the
//!   [`RequirementRegistry`] in step with the source, and turns every claim
//!   that no checker covers into a proof obligation synthesized from the
//!   satisfier's body.

pub mod bindings;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod formula;
pub mod history;
pub mod knowledge;
pub mod registry;
pub mod shell_type;
pub mod synth;

pub use bindings::{Bindings, CheckArgs};
pub use config::EngineConfig;
pub use context::{ShellContext, SharedContext};
pub use dispatch::{Dispatcher, ShellCall};
pub use formula::Formula;
pub use history::{HistoryRing, HistoryStore};
pub use knowledge::{CompletionSource, KnowledgeBase, NoCompletions};
pub use registry::{CheckerEntry, RequirementRegistry};
pub use shell_type::{MethodShape, ShellType, ShellTypeBuilder};
pub use synth::{LocatedError, ProofObligation, synthesize};
