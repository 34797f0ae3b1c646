//! lazyprops-core: lazily processed configuration properties
//!
//! This crate wraps a `.properties`-style key/value store and expands
//! `@{...}` placeholders when a property inside the `cryptomator.` namespace
//! is read.
//!
//! # Example
//!
//! ```rust
//! use lazyprops_core::{PropertyProcessor, PropertyStore, Substitutions};
//!
//! let store = PropertyStore::parse(r#"
//! user.home=/home/alice
//! cryptomator.logDir=@{userhome}/.local/share/Cryptomator/logs
//! cryptomator.pluginDir=@{appdir}/plugins
//! "#).unwrap();
//! let env: Substitutions = [("APPDIR", "/opt/cryptomator")].into_iter().collect();
//!
//! let props = PropertyProcessor::new(store, env);
//! assert_eq!(
//!     props.get_property("cryptomator.logDir").as_deref(),
//!     Some("/home/alice/.local/share/Cryptomator/logs")
//! );
//! assert_eq!(
//!     props.get_property("cryptomator.pluginDir").as_deref(),
//!     Some("/opt/cryptomator/plugins")
//! );
//! assert_eq!(props.get_property("missing"), None);
//! ```

pub mod environment;
pub mod error;
pub mod placeholder;
pub mod store;

mod processor;

pub use environment::{parse_entry, Substitutions};
pub use error::{Error, ErrorKind, Result};
pub use placeholder::{Placeholder, Source, Token};
pub use processor::{ProcessHook, ProcessorOptions, PropertyProcessor, DEFAULT_NAMESPACE};
pub use store::PropertyStore;
