// Core commands
pub mod completions;
pub mod run;
