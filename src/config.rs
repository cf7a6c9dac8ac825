use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Behaviour of a [`DelayNotifier`](crate::DelayNotifier).
///
/// Can be built in code with the `with_*` methods or deserialized, in which case every field is
/// optional and the collection window is given in milliseconds:
///
/// ```
/// # fn main() -> Result<(), serde_json::Error> {
/// let settings: tower_notify::Settings =
///     serde_json::from_str(r#"{ "window_ms": 250, "identity": "billing" }"#)?;
///
/// assert_eq!(settings.window, std::time::Duration::from_millis(250));
/// assert_eq!(settings.max_messages, 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of messages the inbox holds before producers have to wait.
    pub capacity: usize,
    /// Interval between two collection cycles, at least [`Settings::MIN_WINDOW`].
    #[serde(rename = "window_ms", deserialize_with = "millis")]
    pub window: Duration,
    /// Maximum number of messages joined into one outbound call; `0` disables the limit.
    pub max_messages: usize,
    /// Inserted between the messages of a group.
    pub separator: String,
    /// Tag prepended to every outbound call as `[identity] ...`.
    pub identity: Option<String>,
}

impl Settings {
    pub const DEFAULT_CAPACITY: usize = 1000;
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_MESSAGES: usize = 5;
    pub const DEFAULT_SEPARATOR: &'static str = "\n===\n";
    /// Shortest collection window; smaller values, zero included, are raised to it.
    pub const MIN_WINDOW: Duration = Duration::from_millis(1);

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window.max(Self::MIN_WINDOW);
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into()).filter(|i| !i.is_empty());
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            window: Self::DEFAULT_WINDOW,
            max_messages: Self::DEFAULT_MAX_MESSAGES,
            separator: Self::DEFAULT_SEPARATOR.to_owned(),
            identity: None,
        }
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(|ms| Duration::from_millis(ms).max(Settings::MIN_WINDOW))
}
