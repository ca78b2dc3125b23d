pub mod components;
pub mod config;
pub mod data_loading;
pub mod day_window;
pub mod file_manager;
pub mod handlers;
pub mod minor_files;
pub mod nonwear;
pub mod sleeplog;
pub mod time_points;

use handlers::{Dispatcher, HandlerRegistry};

/// Registers every component's handlers and attaches them.
pub fn build_dispatcher() -> Dispatcher {
    let mut registry = HandlerRegistry::new();
    components::register_all(&mut registry);
    registry.attach()
}
