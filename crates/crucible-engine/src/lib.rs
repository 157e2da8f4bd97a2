//! Search engine boundary for Crucible
//!
//! The traversal algorithms live in an external collaborator. This crate
//! defines the job/event vocabulary spoken across that boundary, the
//! [`SearchEngine`] trait a session consumes, and adapters for reaching an
//! engine as a child process, over HTTP, or from a recorded script.

pub mod event;
pub mod engine;
pub mod wire;
pub mod engines;


pub use event::{EngineEvent, EngineFailure, ResultPolicy, SearchJob, SearchMode};
pub use engine::{EngineError, EngineStream, SearchEngine};
pub use engines::{EngineSpec, create_engine};
pub use engines::scripted::{ScriptStep, ScriptedEngine};
