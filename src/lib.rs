//! XlentCar backend: accounts, car listings with photo uploads, and a newsletter hook.

pub mod auth;
pub mod cars;
pub mod config;
pub mod cors;
pub mod db_client;
pub mod encryption_engine;
pub mod error;
pub mod file_server;
pub mod health;
pub mod server;
pub mod state;
pub mod storage;
pub mod store;
pub mod subscribe;
pub mod supabase;
pub mod users;
