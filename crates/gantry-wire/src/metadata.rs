//! Request metadata and the transport-derived fields added to it.

use serde_json::{Map, Value, json};

/// Protocol version advertised to handlers under [`keys::VERSION`].
pub const PROTOCOL_VERSION: [u64; 2] = [1, 0];

/// Metadata keys inserted by the transport before handler invocation.
pub mod keys {
    /// Protocol version marker.
    pub const VERSION: &str = "gantry.version";
    /// Whether requests may be handled on multiple threads at once.
    pub const MULTITHREAD: &str = "gantry.multithread";
    /// Whether the handler may run in multiple processes.
    pub const MULTIPROCESS: &str = "gantry.multiprocess";
    /// Whether the process handles a single request and exits.
    pub const RUN_ONCE: &str = "gantry.run_once";
    /// Derived URL scheme, `"http"` or `"https"`.
    pub const URL_SCHEME: &str = "gantry.url_scheme";
}

/// Request key consulted when deriving the URL scheme.
const HTTPS_KEY: &str = "HTTPS";

/// Values of [`HTTPS_KEY`] that select the `https` scheme.
const HTTPS_TRUTHY: [&str; 3] = ["yes", "on", "1"];

/// Request metadata decoded from the first frame of a connection.
///
/// The mapping is opaque to the gateway apart from the transport
/// fields [`augment`](Self::augment) adds before handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Wraps the decoded metadata object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Looks up a metadata value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of metadata fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the metadata object has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying mapping.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the metadata and returns the underlying mapping.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Adds the transport-derived fields handlers rely on.
    ///
    /// Keys already present are left untouched. The capability flags
    /// reflect this transport's actual guarantees: requests are handled
    /// one at a time, a multiprocess deployment is assumed, and
    /// requests are not re-run.
    pub fn augment(&mut self) {
        let scheme = self.derived_url_scheme();
        self.insert_if_absent(keys::VERSION, json!(PROTOCOL_VERSION));
        self.insert_if_absent(keys::MULTITHREAD, Value::Bool(false));
        self.insert_if_absent(keys::MULTIPROCESS, Value::Bool(true));
        self.insert_if_absent(keys::RUN_ONCE, Value::Bool(false));
        self.insert_if_absent(keys::URL_SCHEME, Value::String(scheme.to_string()));
    }

    /// URL scheme derived from the request's `HTTPS` field.
    #[must_use]
    pub fn derived_url_scheme(&self) -> &'static str {
        match self.0.get(HTTPS_KEY) {
            Some(Value::String(flag)) if HTTPS_TRUTHY.contains(&flag.as_str()) => "https",
            _ => "http",
        }
    }

    fn insert_if_absent(&mut self, key: &str, value: Value) {
        self.0.entry(key.to_string()).or_insert(value);
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
