//! Control script language.
//!
//! A payload is a line-oriented script. It reaches the robot only through
//! the mock operations bound in [`bindings`], and everything it defines
//! lands in a [`Namespace`] the harness can read afterwards.
//!
//! ```text
//! let obs = detect_objects
//! if $obs
//!   let seen = label $obs
//! end
//! go_to 1 2 frame=map
//! ```
mod args;
mod bindings;
mod builtins;
mod interp;
mod namespace;
mod parse;
mod value;

pub use bindings::MOCK_OPERATIONS;
pub use interp::{Interpreter, Limits};
pub use namespace::Namespace;
pub use parse::parse_program;
pub use value::Value;
