pub mod action;
pub mod compile;
pub mod config;
pub mod context;
pub mod interactive;
pub mod natord;
pub mod str_interp;
pub mod style;
pub mod testing;

pub use crate::config::Config;
pub use crate::context::ExecutionContext;
