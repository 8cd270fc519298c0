pub mod config;
pub mod feed;
pub mod model;
pub mod pipeline;
pub mod sink;
