pub mod config;
pub mod dispatcher;
pub mod logger;
pub mod operation;
pub mod session;
