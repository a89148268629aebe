//! Image filtering service
//!
//! Fetches an image from a public URL, resizes it to 256x256, converts it to
//! greyscale JPEG at quality 60, writes it to a transient file and hands the
//! path to the caller, who deletes it again once the bytes have been sent.

pub mod error;
pub mod fetch;
pub mod image;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
