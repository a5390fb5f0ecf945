pub mod config;
pub mod history;
pub mod play;
pub mod reset;
pub mod round;
pub mod stats;
pub mod target;
pub mod tier;
