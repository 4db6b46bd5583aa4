#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod engine;
mod error;
mod io;
#[cfg(feature = "live")]
pub mod live;
#[cfg(feature = "logging")]
pub mod logging;
pub mod page;
pub mod pattern;
pub mod pipeline;
pub mod reload;
pub mod task;

pub use crate::config::{Config, Profile};
pub use crate::engine::Report;
pub use crate::error::*;
pub use crate::pipeline::{Pipeline, Plan, Recipe, Service};
pub use crate::task::Task;
