//! CLI command handlers. Each command is in its own file.

mod extract;
mod load;
mod scan;

pub use extract::run_extract;
pub use scan::run_scan;
