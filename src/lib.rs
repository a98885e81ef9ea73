pub mod battle;
pub mod chart;
pub mod config;
pub mod pool;
pub mod session;
pub mod timing;
pub mod util;
