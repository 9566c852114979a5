#![cfg(test)]

pub mod common;
pub mod event_tests;
pub mod lifecycle_tests;
pub mod runtime_tests;
pub mod security_tests;
