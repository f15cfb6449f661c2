//! Client environment probe: the live values that go into the connect-time
//! snapshot alongside stored session state.

use chrono::{Local, Offset};

/// Locale and UTC offset of the client at the moment of connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnv {
    /// Minutes west of UTC (positive west, negative east), matching the
    /// convention the server expects for `timezoneOffset`.
    pub timezone_offset: i32,
    /// BCP 47 language tag, e.g. `en-US`.
    pub language: String,
}

impl ClientEnv {
    /// Probe the running process for its UTC offset and locale.
    pub fn detect() -> Self {
        let offset_secs = Local::now().offset().fix().local_minus_utc();

        let language = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(|tag| tag.replace('_', "-")))
            .filter(|tag| !tag.is_empty() && tag != "C" && tag != "POSIX")
            .unwrap_or_else(|| "en-US".to_string());

        Self {
            timezone_offset: -offset_secs / 60,
            language,
        }
    }
}
