// Domain layer - Core types with no I/O
pub mod chart;
pub mod dashboard;
pub mod fridge;
pub mod sensor;
pub mod telemetry;
