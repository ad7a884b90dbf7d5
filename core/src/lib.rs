pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod service;
pub mod store;
pub mod sync;
pub mod view;
