//! Progress listeners for the console

pub mod reporter;
