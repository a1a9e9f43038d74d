#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

pub mod acquisition;
pub(crate) mod api;
pub mod app;
pub mod classification;
pub mod config;
pub mod evaluation;
pub mod history;
pub mod inference;
pub mod observability;
pub mod session;
pub mod training;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
