//! nutri-flow: guided multi-step flows over a nutrition backend.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod flows;
pub mod gateway;
