pub mod app;
pub mod client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod forms;
pub mod input;
pub mod keymap;
pub mod storage;
pub mod stream;
pub mod transcript;
pub mod ui;
