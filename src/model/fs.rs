use std::fmt;

/// Errors raised by the typed layer of the asset store and by the remote clients.
///
/// The filesystem contract collapses every variant into a single failure
/// value; the variants exist so logs and typed callers can tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound(_))
    }
}

impl From<reqwest::Error> for AssetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AssetError::Decode(err.to_string())
        } else {
            AssetError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Decode(err.to_string())
    }
}

/// Coarse content category the remote service files each asset under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Image,
    Video,
    Raw,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
        }
    }
}

impl Default for ResourceType {
    fn default() -> Self {
        ResourceType::Image
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_as_str() {
        let cases = vec![
            (ResourceType::Image, "image"),
            (ResourceType::Video, "video"),
            (ResourceType::Raw, "raw"),
        ];

        for (rt, expected) in cases {
            assert_eq!(rt.as_str(), expected);
            assert_eq!(rt.to_string(), expected);
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(AssetError::NotFound("a".to_string()).is_not_found());
        assert!(!AssetError::Transport("a".to_string()).is_not_found());
        assert!(!AssetError::Api {
            status: 500,
            message: "boom".to_string()
        }
        .is_not_found());
    }
}
