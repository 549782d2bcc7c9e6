pub mod contract;
pub mod error;
pub mod examples;
pub mod function;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod telemetry;
