// src/lib.rs

//! refcat: personal reference catalog library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod presentation;
pub mod query;
pub mod sources;
pub mod storage;
pub mod utils;
