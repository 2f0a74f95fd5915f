//! Utility modules for testing and development

pub mod scripted_driver;

pub use scripted_driver::ScriptedGridDriver;
