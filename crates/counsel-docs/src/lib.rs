//! Document handling for the Counsel relay.
//!
//! - [`pdf`] lays a reply out line by line and renders it with `printpdf`.
//! - [`table`] turns pipe-delimited reply lines into CSV.
//! - [`extract`] pulls text out of uploaded files for the prompt.

pub mod error;
pub mod extract;
pub mod pdf;
pub mod table;

pub use error::{Error, Result};
