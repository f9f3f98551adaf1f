//! Smarteam Backend Library
//!
//! This library provides the authentication backend for the Smarteam team
//! management application: credential storage, password hashing, session
//! tokens, administrator seeding and the HTTP API that ties them together.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod seed;
pub mod user;
