//! Command handlers

pub mod bookmark;
pub mod check;
pub mod config;
pub mod tag;
