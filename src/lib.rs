pub mod activities;
pub mod analysis;
pub mod app;
pub mod auth;
pub mod balance;
pub mod calendar;
pub mod config;
pub mod error;
pub mod images;
pub mod plates;
pub mod profile;
pub mod state;
pub mod storage;
