//! Plain-language instructions in, Appium actions out.
//!
//! An instruction is resolved to a catalog action by a text-completion call
//! ([`llm::instruction`]), dispatched to its handler ([`actions::dispatcher`])
//! and executed over a W3C driver session ([`driver`]). Search is driven by a
//! heuristic scan of the UI tree ([`screen::scanner`], [`locator`]).

pub mod actions;
pub mod cli;
pub mod device;
pub mod driver;
pub mod error;
pub mod llm;
pub mod locator;
pub mod report;
pub mod screen;
pub mod script;

pub use error::{PilotError, PilotResult};
