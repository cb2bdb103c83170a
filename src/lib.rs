// Library exports for the CLI and integration tests
pub mod buckets;
pub mod config;
pub mod dashboard;
pub mod leaderboard;
pub mod logging;
pub mod model;
pub mod progress;
pub mod renderer;
pub mod stats;
pub mod store;
pub mod timefmt;
pub mod timestamp;
pub mod window;
