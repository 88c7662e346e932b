//! Core types, collaborator traits, and the request pipeline logic for the
//! Counsel legal chat relay.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! classifier, persona table, prompt assembler, and response formatter are
//! pure functions over plain data; the outbound services they feed are
//! described by the traits in [`store`] and [`upstream`].

// Store backends implement the traits with native `async fn`.
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod artifact;
pub mod classify;
pub mod error;
pub mod format;
pub mod message;
pub mod persona;
pub mod prompt;
pub mod store;
pub mod upload;
pub mod upstream;

pub use error::{Error, Result};
