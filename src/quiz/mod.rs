pub mod generator;
pub mod session;
