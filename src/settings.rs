use std::str::FromStr;

// ---------------------------------------------------------------------------
// Runtime settings (environment driven)
// ---------------------------------------------------------------------------

pub const SERVICE_URL_VAR: &str = "PLAYGROUND_SERVICE_URL";
pub const TIMEOUT_VAR: &str = "PLAYGROUND_TIMEOUT_SECS";
pub const PREVIEW_ROWS_VAR: &str = "PLAYGROUND_PREVIEW_ROWS";

/// Where the processing service lives and how the UI presents data.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the processing service.
    pub service_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Rows shown in each preview table.
    pub preview_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 60,
            preview_rows: 50,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        let service_url = lookup(SERVICE_URL_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.service_url);

        Self {
            service_url,
            timeout_secs: parse_or(&lookup, TIMEOUT_VAR, defaults.timeout_secs),
            preview_rows: parse_or(&lookup, PREVIEW_ROWS_VAR, defaults.preview_rows),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("{key}={raw:?} is not valid, using {default}");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(Settings::from_lookup(lookup(&[])), Settings::default());
    }

    #[test]
    fn reads_overrides() {
        let s = Settings::from_lookup(lookup(&[
            (SERVICE_URL_VAR, " http://ml-box:8080 "),
            (TIMEOUT_VAR, "5"),
            (PREVIEW_ROWS_VAR, "10"),
        ]));
        assert_eq!(s.service_url, "http://ml-box:8080");
        assert_eq!(s.timeout_secs, 5);
        assert_eq!(s.preview_rows, 10);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let s = Settings::from_lookup(lookup(&[(TIMEOUT_VAR, "soon"), (SERVICE_URL_VAR, "")]));
        assert_eq!(s.timeout_secs, 60);
        assert_eq!(s.service_url, "http://127.0.0.1:5000");
    }
}
