//! NOVA is the client core and command-line front end for the NOVA AI chat
//! service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the backend payloads and the HTTP client that carries
//!   the shared bearer token.
//! - [`auth`] owns the login lifecycle: credential persistence, bootstrap,
//!   and the cached user profile.
//! - [`core`] holds storage, conversation state, the chat controller,
//!   transcript formatting, configuration, and the route guard.
//! - [`utils`] provides clipboard access, prompts, logging setup, and URL
//!   helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod utils;
