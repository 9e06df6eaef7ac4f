//! Route map configuration for the CLI

pub mod loader;
pub mod route_map;

pub use loader::CliConfigLoader;
pub use route_map::RouteMap;
