//! Tool catalog and dispatch.
//!
//! This module provides the named operations clients call, their argument
//! schemas, and the table that routes each call to the analysis engine.

pub mod dispatcher;
pub mod schema;

pub use dispatcher::{Dispatcher, ToolResult};
pub use schema::get_tool_definitions;
