//! Build-time generated tool catalog.
//!
//! The contents come from `graphgen` run by `build.rs` over `api_specs/`;
//! see `graphgen::emit` for the templates.

include!(concat!(env!("OUT_DIR"), "/catalog.rs"));
