mod cli;
mod commands;
mod infra;

pub use cli::run;
