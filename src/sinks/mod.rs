pub mod collecting;
pub mod log;
