//! Bridge between the egui thread and the async classifier worker.

pub mod commands;
pub mod runtime;
