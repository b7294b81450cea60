pub mod analyzers;
pub mod fetch;
pub mod infra;
pub mod majors;
pub mod normalize;
pub mod output;
pub mod services;
pub mod session;
pub mod stats;
