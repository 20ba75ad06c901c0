pub mod evaluator;
pub mod process;
pub mod result;
pub mod runner;
pub mod testcase;

pub use evaluator::*;
pub use process::*;
pub use result::*;
pub use runner::*;
pub use testcase::*;
