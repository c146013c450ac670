#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod source;
pub mod stats;
