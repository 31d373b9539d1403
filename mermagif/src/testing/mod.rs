//! Test doubles for the pipeline's external collaborators.
//!
//! These are compiled into the library so downstream crates can drive the
//! pipeline in their own tests without a model endpoint or a browser.

pub mod mocks;
