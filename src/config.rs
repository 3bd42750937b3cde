use crate::error::ConfigError;

// ============================================================================
// Configuration
// ============================================================================

/// Backend and session defaults for the search controller. UI-adjacent state
/// like the "recent jurisdictions" list is passed in here explicitly rather
/// than read from any global store.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub backend_url: String,
    /// Jurisdictions searched when the caller does not name any.
    pub default_jurisdictions: Vec<String>,
    /// Jurisdictions the user touched most recently, newest first.
    pub recent_jurisdictions: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            default_jurisdictions: Vec::new(),
            recent_jurisdictions: Vec::new(),
            request_timeout_secs: 120,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_raw =
            std::env::var("REQUEST_TIMEOUT_SECS").unwrap_or_else(|_| "120".to_string());
        let request_timeout_secs =
            timeout_raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "REQUEST_TIMEOUT_SECS",
                    value: timeout_raw,
                })?;

        Ok(Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            default_jurisdictions: std::env::var("SEARCH_JURISDICTIONS")
                .map(|v| parse_code_list(&v))
                .unwrap_or_default(),
            recent_jurisdictions: Vec::new(),
            request_timeout_secs,
        })
    }

    pub fn stream_endpoint(&self) -> String {
        format!("{}/api/search/stream", self.backend_url.trim_end_matches('/'))
    }
}

fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_list() {
        assert_eq!(parse_code_list("co, nv ,TX"), vec!["CO", "NV", "TX"]);
        assert_eq!(parse_code_list(""), Vec::<String>::new());
        assert_eq!(parse_code_list(" , ,"), Vec::<String>::new());
    }

    #[test]
    fn test_stream_endpoint_strips_trailing_slash() {
        let config = SearchConfig {
            backend_url: "http://api.example.com/".to_string(),
            ..SearchConfig::default()
        };
        assert_eq!(
            config.stream_endpoint(),
            "http://api.example.com/api/search/stream"
        );
    }
}
