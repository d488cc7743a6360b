//! Robots.txt handling module
//!
//! A [`RobotsGate`] is built once per scan and consulted for every crawled page.

mod gate;
mod parser;

pub use gate::{RobotsGate, ROBOTS_USER_AGENT};
pub use parser::ParsedRobots;
