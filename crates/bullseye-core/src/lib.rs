pub mod acquisition;
pub mod analysis;
pub mod capture;
pub mod condition;
pub mod config;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
