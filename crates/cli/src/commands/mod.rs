//! CLI commands for the batch jobs.

pub mod cot_file;
pub mod economics;
pub mod fetch_history;
pub mod us_marks;

pub use cot_file::run_cot_file;
pub use economics::{run_economics, EconomicsArgs};
pub use fetch_history::{run_fetch_history, FetchHistoryArgs};
pub use us_marks::{run_us_marks, UsMarksArgs};
