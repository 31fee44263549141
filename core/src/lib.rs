pub mod catalog;
pub mod config;
pub mod event;
pub mod layout;
pub mod model;
pub mod persistence;
pub mod restore;
pub mod storage;
pub mod sync;
pub mod workspace;
