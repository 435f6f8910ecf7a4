/// Options every invocation starts from. Callers may override any of them.
pub const DEFAULT_OPTIONS: &[(&str, &str)] = &[
    ("report-type", "json"),
    ("allow-online-as-test", "true"),
    ("sampling", "false"),
];

/// The report type that switches the decoder into finding mode.
pub const JSON_REPORT: &str = "json";

/// Ordered option set handed to the analyzer process.
///
/// Keys keep the position of their first insertion; a later value for the
/// same key overwrites in place. Nothing here validates keys or values,
/// the analyzer itself is the authority on which options exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationConfig {
    options: Vec<(String, String)>,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self::build(DEFAULT_OPTIONS.iter().copied(), std::iter::empty::<(&str, &str)>())
    }
}

impl InvocationConfig {
    /// Merge `overrides` over `defaults`; the override wins on a key collision.
    pub fn build<D, O, K, V>(defaults: D, overrides: O) -> Self
    where
        D: IntoIterator<Item = (K, V)>,
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self { options: Vec::new() };
        config.merge(defaults);
        config.merge(overrides);
        config
    }

    /// Defaults plus caller overrides.
    pub fn with_overrides<O, K, V>(overrides: O) -> Self
    where
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::default();
        config.merge(overrides);
        config
    }

    pub fn merge<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Report type requested from the analyzer (`json` when unset).
    pub fn report_type(&self) -> &str {
        self.get("report-type").unwrap_or(JSON_REPORT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// One `-key=value` argument per option, in insertion order.
    pub fn to_args(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("-{k}={v}")).collect()
    }

    /// The space-joined flag string, as it would appear on a command line.
    pub fn flag_string(&self) -> String {
        self.to_args().join(" ")
    }
}
