pub mod history;
pub mod memory;
pub mod models;
pub mod run;
