#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

pub mod application;
pub mod configuration;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;
