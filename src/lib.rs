pub mod catalog;
pub mod chimie;
pub mod cli;
pub mod display;
pub mod fixtures;
pub mod search;
