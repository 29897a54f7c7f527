pub mod adapters;
pub mod application;
pub mod config;
pub mod error;
pub mod web;
