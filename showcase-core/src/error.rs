/// Error taxonomy for mesh loading and screen navigation
use crate::stl::StlFormat;

/// A parse produced nothing usable.
///
/// Malformed numbers inside an ASCII STL are not reported here: they parse
/// to NaN and flow through to rendering unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no triangles found in {format} STL data")]
    Empty { format: StlFormat },
}

/// An asset or a screen fragment could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("asset unavailable: {name} ({reason})")]
    AssetUnavailable { name: String, reason: String },
    #[error("invalid base64 asset payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("screen fragment unavailable: {name} ({reason})")]
    FragmentUnavailable { name: String, reason: String },
    #[error("invalid screen markup for: {name}")]
    MalformedFragment { name: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A navigation request was rejected or recovered.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("invalid screen name: {0:?}")]
    InvalidName(String),
    #[error("navigation to {requested} dropped: another transition is in progress")]
    Reentrant { requested: String },
    #[error("failed to load screen: {0}")]
    Load(#[from] LoadError),
}

/// Raised by a screen init hook. Logged, never propagated to the host.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("screen init failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
