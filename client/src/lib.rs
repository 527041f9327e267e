// Crate root for the race timing client.

pub mod app;
pub mod clock;
pub mod config_gate;
pub mod constants;
pub mod error;
pub mod http;
pub mod results;
pub mod scheduler;
pub mod settings;
pub mod stream;
pub mod ui;
pub mod utils;
