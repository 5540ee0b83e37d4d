pub mod app;
pub mod config;
pub mod domain;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod matching;
pub mod model;
pub mod output;
pub mod resolve;
pub mod score;
