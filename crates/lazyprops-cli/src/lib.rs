//! lazyprops CLI library
//!
//! Exposes the CLI entry point together with the loading and rendering
//! helpers it is built from.

mod cli;

pub use cli::{
    build_processor, home_dir, load_store, render_property, render_store, run, run_from,
    run_with_output, unknown_placeholders, unresolved_placeholders, Overrides,
};
