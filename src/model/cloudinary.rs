use serde::Deserialize;

use crate::model::fs::ResourceType;

/// Delivery type assets land under when uploaded through the upload API.
pub const DELIVERY_UPLOAD: &str = "upload";

/// Resource type sent with uploads; the service detects the real one.
pub const UPLOAD_RESOURCE_TYPE: &str = "auto";

/// Largest page the listing endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Descriptor of a stored asset as returned by the admin API.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Resource {
    pub public_id: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default, rename = "type")]
    pub delivery_type: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub secure_url: String,
}

/// One page of a resource listing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UploadResponse {
    pub public_id: String,
    pub bytes: u64,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub secure_url: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DestroyResponse {
    pub result: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RenameResponse {
    pub public_id: Option<String>,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorMessage {
    pub message: String,
}

/// Parameters of a listing call.
#[derive(Clone, Debug, PartialEq)]
pub struct ListRequest {
    pub resource_type: ResourceType,
    pub delivery_type: Option<String>,
    pub prefix: Option<String>,
    pub max_results: u32,
    pub next_cursor: Option<String>,
}

impl ListRequest {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            delivery_type: None,
            prefix: None,
            max_results: 10,
            next_cursor: None,
        }
    }
}

/// Parameters of an upload call.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadRequest {
    pub public_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_resource() {
        let body = r#"{
            "asset_id": "b5e6d2b39ba3e0869d67141ba7dba6cf",
            "public_id": "a/b/sample",
            "format": "jpg",
            "version": 1312461204,
            "resource_type": "image",
            "type": "upload",
            "created_at": "2018-01-21T09:21:16Z",
            "bytes": 120253,
            "width": 864,
            "height": 576,
            "url": "http://res.cloudinary.com/demo/image/upload/v1312461204/a/b/sample.jpg",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1312461204/a/b/sample.jpg"
        }"#;

        let resource: Resource = serde_json::from_str(body).unwrap();
        assert_eq!(resource.public_id, "a/b/sample");
        assert_eq!(resource.format, "jpg");
        assert_eq!(resource.delivery_type, "upload");
        assert_eq!(resource.bytes, 120253);
        assert_eq!(resource.created_at, "2018-01-21T09:21:16Z");
        assert!(resource.secure_url.starts_with("https://"));
    }

    #[test]
    fn test_decode_page() {
        let cases = vec![
            (r#"{"resources":[{"public_id":"a","format":"png"}],"next_cursor":"abc"}"#, 1, Some("abc")),
            (r#"{"resources":[]}"#, 0, None),
            (r#"{"resources":[{"public_id":"a"},{"public_id":"b"}],"next_cursor":null}"#, 2, None),
        ];

        for (body, count, cursor) in cases {
            let page: ResourcePage = serde_json::from_str(body).unwrap();
            assert_eq!(page.resources.len(), count, "failed count for case: {}", body);
            assert_eq!(page.next_cursor.as_deref(), cursor, "failed cursor for case: {}", body);
        }
    }

    #[test]
    fn test_decode_error_body() {
        let body = r#"{"error":{"message":"Resource not found - missing"}}"#;
        let err: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(err.error.message, "Resource not found - missing");
    }
}
