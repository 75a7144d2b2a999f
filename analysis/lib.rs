#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod clean;
pub mod decompose;
pub mod features;
pub mod forecast;
pub mod insights;
pub mod load;
pub mod schema;
pub mod stats;
pub mod table;
pub mod views;

#[path = "../report/mod.rs"]
pub mod report;
