//! # API Module
//!
//! Contains the HTTP API of the Rosetta middleware.
//!
//! ## Structure
//!
//! * `controllers` - Request handling, delegating to the services
//! * `routes` - API endpoint definitions and routing

pub mod controllers;

pub mod routes;
