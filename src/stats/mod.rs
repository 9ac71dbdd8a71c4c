pub mod cache;
pub mod config;
pub mod delta;
pub mod engine;
pub mod history;
pub mod metadata;
pub mod normalize;
pub mod paths;
pub mod projection;
pub mod snapshot;
pub mod util;
