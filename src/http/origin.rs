//! Origin server address normalization.

use axum::http::Uri;
use url::Url;

/// Error produced when the configured origin cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin is empty")]
    Empty,

    #[error("invalid origin '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported origin scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("origin '{0}' has no host")]
    MissingHost(String),
}

/// The single upstream server, normalized to a base URL without a trailing
/// slash, query or fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: String,
}

impl Origin {
    /// Normalize a configured origin. Bare `host:port` or `host` values get
    /// an `http://` scheme.
    pub fn parse(raw: &str) -> Result<Self, OriginError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OriginError::Empty);
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };
        let mut url = Url::parse(&candidate).map_err(|source| OriginError::Parse {
            origin: raw.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(OriginError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(OriginError::MissingHost(raw.to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);
        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { base })
    }

    /// Base URL, e.g. `http://localhost:3000`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Outbound URL for an inbound request URI: base + path + `?query`.
    pub fn url_for(&self, uri: &Uri) -> String {
        let mut url = format!("{}{}", self.base, uri.path());
        if let Some(query) = uri.query() {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base)
    }
}
