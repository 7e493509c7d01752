#[path = "../common/mod.rs"]
mod common;

mod geometry;
mod schedule;
mod transport;
