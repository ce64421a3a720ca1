pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod markup;
pub mod notify;
pub mod print;
pub mod records;
pub mod spreadsheet;
pub mod storage;
pub mod store;
pub mod timeline;
pub mod ui;
pub mod views;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
