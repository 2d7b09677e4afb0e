//! CLI command implementations.
//!
//! | Module   | Handles                                   |
//! |----------|-------------------------------------------|
//! | `submit` | the default sync-and-submit invocation    |

pub mod submit;

pub use submit::{SubmitArgs, cmd_submit};
