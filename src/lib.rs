pub mod archive;
pub mod calendar;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod http_client;
pub mod layouts;
pub mod models;
pub mod storage;
pub mod trigger;
