//! Lazily processed property access
//!
//! [`PropertyProcessor`] wraps a [`PropertyStore`] and expands placeholders
//! only when a property is read, and only for keys inside its namespace
//! (`cryptomator.` by default). Processing never fails: unknown tokens are
//! kept verbatim and tokens whose source is missing become empty strings.

use std::sync::Arc;

use regex::Captures;

use crate::environment::Substitutions;
use crate::placeholder::{self, Source, Token};
use crate::store::PropertyStore;

/// Key prefix that enables placeholder processing by default
pub const DEFAULT_NAMESPACE: &str = "cryptomator.";

/// Observer called with the raw value each time [`PropertyProcessor::process`] runs
pub type ProcessHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for a [`PropertyProcessor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Case-sensitive key prefix whose values get processed
    pub namespace: String,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Property accessor that expands `@{...}` placeholders on read
#[derive(Clone)]
pub struct PropertyProcessor {
    /// Raw property values; also the source of `user.home`
    store: Arc<PropertyStore>,
    /// Replacement text for environment-backed tokens
    substitutions: Arc<Substitutions>,
    options: ProcessorOptions,
    hook: Option<ProcessHook>,
}

impl std::fmt::Debug for PropertyProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyProcessor")
            .field("store", &self.store)
            .field("substitutions", &self.substitutions)
            .field("options", &self.options)
            .field("hook", &self.hook.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PropertyProcessor {
    /// Create a processor with the default namespace
    pub fn new(store: impl Into<Arc<PropertyStore>>, substitutions: Substitutions) -> Self {
        Self::with_options(store, substitutions, ProcessorOptions::default())
    }

    /// Create a processor with custom options
    pub fn with_options(
        store: impl Into<Arc<PropertyStore>>,
        substitutions: Substitutions,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            store: store.into(),
            substitutions: Arc::new(substitutions),
            options,
            hook: None,
        }
    }

    /// Install an observer that sees every value passed to [`process`](Self::process)
    pub fn with_process_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// The backing store
    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// The substitution table
    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Get a property, processing it if its key is inside the namespace
    ///
    /// Returns `None` without processing anything when the key is absent.
    pub fn get_property(&self, key: &str) -> Option<String> {
        let value = self.store.get(key)?;

        if key.starts_with(self.options.namespace.as_str()) {
            Some(self.process(value))
        } else {
            log::trace!("'{}' is outside namespace '{}'", key, self.options.namespace);
            Some(value.to_string())
        }
    }

    /// Get a property, falling back to `default` when the key is absent
    pub fn get_property_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get_property(key).unwrap_or_else(|| default.into())
    }

    /// Keys of the backing store, in order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.store.keys()
    }

    /// Copy of the store with every property read through [`get_property`](Self::get_property)
    pub fn resolve_all(&self) -> PropertyStore {
        self.store
            .keys()
            .filter_map(|key| self.get_property(key).map(|value| (key, value)))
            .collect()
    }

    /// Expand all placeholders in `value`
    ///
    /// Spans are replaced in a single left-to-right pass over the input.
    /// Replacement text is never scanned again, so `@{@{appdir}}` becomes
    /// `@{<appdir>}` rather than resolving twice.
    pub fn process(&self, value: &str) -> String {
        if let Some(hook) = &self.hook {
            hook(value);
        }

        placeholder::pattern()
            .replace_all(value, |caps: &Captures<'_>| {
                match Token::from_name(&caps[1]) {
                    Some(token) => self.resolve(token).to_string(),
                    None => {
                        log::warn!("Unknown variable {} in property value {}", &caps[0], value);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Replacement text for a recognized token
    ///
    /// A missing source resolves to the empty string.
    pub fn resolve(&self, token: Token) -> &str {
        let source = token.source();
        let found = match source {
            Source::Environment(name) => self.substitutions.get(name),
            Source::Property(name) => self.store.get(name),
        };

        found.unwrap_or_else(|| {
            log::warn!(
                "Variable {} used for substitution not found in {}. Replaced with empty string.",
                token.keyword(),
                source
            );
            ""
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn processor_with_appdir() -> PropertyProcessor {
        PropertyProcessor::new(
            PropertyStore::new(),
            [("APPDIR", "foobar")].into_iter().collect(),
        )
    }

    /// Processor whose `process` calls are recorded
    fn recording(store: PropertyStore) -> (PropertyProcessor, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&calls);
        let processor = PropertyProcessor::new(store, Substitutions::new())
            .with_process_hook(move |value| recorder.lock().unwrap().push(value.to_string()));
        (processor, calls)
    }

    // Processing

    #[test]
    fn test_unknown_token_is_untouched() {
        let p = processor_with_appdir();
        assert_eq!(
            p.process("unknown.@{testToken}.test"),
            "unknown.@{testToken}.test"
        );
    }

    #[test]
    fn test_backslash_before_brace_is_literal() {
        let p = processor_with_appdir();
        assert_eq!(
            p.process("@{only*words*digits*under_score\\}"),
            "@{only*words*digits*under_score\\}"
        );
    }

    #[test]
    fn test_windows_path() {
        let p = processor_with_appdir();
        assert_eq!(
            p.process("C:\\Users\\@{appdir}\\dir"),
            "C:\\Users\\foobar\\dir"
        );
    }

    #[test]
    fn test_nested_placeholder_resolves_inner_span_once() {
        let p = processor_with_appdir();
        assert_eq!(p.process("@{@{appdir}}"), "@{foobar}");
    }

    #[test]
    fn test_multiple_occurrences() {
        let p = processor_with_appdir();
        assert_eq!(
            p.process("Longer @{appdir} text with @{appdir}."),
            "Longer foobar text with foobar."
        );
    }

    #[test]
    fn test_userhome_from_store() {
        let store: PropertyStore = [("user.home", "OneUponABit")].into_iter().collect();
        let p = PropertyProcessor::new(store, Substitutions::new());
        assert_eq!(p.process("@{userhome}"), "OneUponABit");
    }

    #[test]
    fn test_env_keywords() {
        let cases = [
            ("appdir", "APPDIR", "foobar"),
            ("appdata", "APPDATA", "bazbaz"),
            ("localappdata", "LOCALAPPDATA", "boboAlice"),
        ];

        for (token, env_name, expected) in cases {
            let p = PropertyProcessor::new(
                PropertyStore::new(),
                [(env_name, expected)].into_iter().collect(),
            );
            assert_eq!(p.process(&format!("@{{{}}}", token)), expected, "token {}", token);
        }
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let p = processor_with_appdir();
        assert_eq!(p.process("@{AppDir}|@{APPDIR}"), "foobar|foobar");
    }

    #[test]
    fn test_missing_source_becomes_empty() {
        let p = PropertyProcessor::new(PropertyStore::new(), Substitutions::new());
        assert_eq!(p.process("[@{appdata}][@{userhome}]"), "[][]");
    }

    #[test]
    fn test_replacement_is_not_rescanned() {
        let p = PropertyProcessor::new(
            PropertyStore::new(),
            [("APPDIR", "@{appdata}"), ("APPDATA", "nope")]
                .into_iter()
                .collect(),
        );
        assert_eq!(p.process("@{appdir}"), "@{appdata}");
    }

    #[test]
    fn test_replacement_with_dollar_is_literal() {
        let p = PropertyProcessor::new(
            PropertyStore::new(),
            [("APPDIR", "$1 ${0} \\")].into_iter().collect(),
        );
        assert_eq!(p.process("@{appdir}"), "$1 ${0} \\");
    }

    #[test]
    fn test_malformed_placeholders_pass_through() {
        let p = processor_with_appdir();
        for value in ["@{appdir", "@{}", "@ {appdir}", "@{app dir}", "", "plain"] {
            assert_eq!(p.process(value), value);
        }
    }

    // get_property

    #[test]
    fn test_undefined_property_is_not_processed() {
        let (p, calls) = recording(PropertyStore::new());

        assert_eq!(p.get_property("some.prop"), None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_undefined_namespaced_property_is_not_processed() {
        let (p, calls) = recording(PropertyStore::new());

        assert_eq!(p.get_property("cryptomator.missing"), None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_properties_outside_namespace_are_not_processed() {
        for key in [
            "example.foo",
            "cryptomatorSomething.foo",
            "org.cryptomator.foo",
            "cryPtoMAtor.foo",
        ] {
            let store: PropertyStore = [(key, "someValue @{appdir}")].into_iter().collect();
            let (p, calls) = recording(store);

            assert_eq!(p.get_property("some.prop"), None);
            assert_eq!(
                p.get_property(key).as_deref(),
                Some("someValue @{appdir}"),
                "key {}",
                key
            );
            assert!(calls.lock().unwrap().is_empty(), "key {}", key);
        }
    }

    #[test]
    fn test_namespaced_property_is_processed() {
        let store: PropertyStore = [("cryptomator.prop", "someValue")].into_iter().collect();
        let (p, calls) = recording(store);

        assert_eq!(p.get_property("cryptomator.prop").as_deref(), Some("someValue"));
        assert_eq!(*calls.lock().unwrap(), vec!["someValue".to_string()]);
    }

    #[test]
    fn test_namespaced_property_expands_tokens() {
        let store: PropertyStore = [
            ("user.home", "/home/alice"),
            ("cryptomator.settingsPath", "@{userhome}/.config/Cryptomator"),
        ]
        .into_iter()
        .collect();
        let p = PropertyProcessor::new(store, Substitutions::new());

        assert_eq!(
            p.get_property("cryptomator.settingsPath").as_deref(),
            Some("/home/alice/.config/Cryptomator")
        );
    }

    #[test]
    fn test_custom_namespace() {
        let store: PropertyStore = [
            ("app.dir", "@{appdir}"),
            ("cryptomator.dir", "@{appdir}"),
        ]
        .into_iter()
        .collect();
        let p = PropertyProcessor::with_options(
            store,
            [("APPDIR", "foobar")].into_iter().collect(),
            ProcessorOptions {
                namespace: "app.".into(),
            },
        );

        assert_eq!(p.get_property("app.dir").as_deref(), Some("foobar"));
        assert_eq!(p.get_property("cryptomator.dir").as_deref(), Some("@{appdir}"));
    }

    #[test]
    fn test_get_property_or() {
        let store: PropertyStore = [("cryptomator.a", "@{appdir}")].into_iter().collect();
        let p = PropertyProcessor::new(store, [("APPDIR", "foobar")].into_iter().collect());

        assert_eq!(p.get_property_or("cryptomator.a", "fallback"), "foobar");
        assert_eq!(p.get_property_or("cryptomator.b", "fallback"), "fallback");
    }

    #[test]
    fn test_resolve_all_keeps_order_and_gating() {
        let store: PropertyStore = [
            ("cryptomator.logDir", "@{appdir}/log"),
            ("other.dir", "@{appdir}/other"),
        ]
        .into_iter()
        .collect();
        let p = PropertyProcessor::new(store, [("APPDIR", "/opt")].into_iter().collect());

        let resolved = p.resolve_all();
        let entries: Vec<_> = resolved.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("cryptomator.logDir", "/opt/log"),
                ("other.dir", "@{appdir}/other"),
            ]
        );
        assert_eq!(
            p.property_names().collect::<Vec<_>>(),
            vec!["cryptomator.logDir", "other.dir"]
        );
    }

    #[test]
    fn test_processor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PropertyProcessor>();
    }
}
