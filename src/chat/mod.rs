pub mod cache;
pub mod orchestrator;
pub mod persona;
pub mod session;
