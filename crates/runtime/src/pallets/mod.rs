//! Runtime modules. Each exposes plain functions over a [`Context`] plus a
//! crate-private `dispatch` for its calls.
//!
//! [`Context`]: crate::Context

pub mod assets;
pub mod broker;
pub mod fungibles;
pub mod ismp;
pub mod orders;
pub mod processor;
pub mod regions;
pub mod xcm;
