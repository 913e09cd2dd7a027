//! In-memory stand-in for the remote service.
//!
//! Keeps assets in a map keyed by resource type and public id, serves them
//! through fake delivery URLs, and can be told to fail any operation.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    adapters,
    model::{
        cloudinary::{
            DestroyResponse, ListRequest, RenameResponse, Resource, ResourcePage, UploadRequest,
            UploadResponse, DELIVERY_UPLOAD,
        },
        fs::{AssetError, ResourceType},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Resource,
    Resources,
    Upload,
    Destroy,
    Rename,
    Fetch,
}

#[derive(Clone, Debug)]
struct StoredAsset {
    format: String,
    content: Vec<u8>,
    created_at: String,
}

#[derive(Default)]
pub struct MockClient {
    assets: Mutex<HashMap<(ResourceType, String), StoredAsset>>,
    failing: Mutex<HashSet<Operation>>,
    fail_listing_after: Mutex<Option<usize>>,
    list_requests: Mutex<Vec<ListRequest>>,
    uploaded_files: Mutex<Vec<PathBuf>>,
    fetched_urls: Mutex<Vec<String>>,
    invalidations: Mutex<Vec<(Operation, bool)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with a transport error.
    pub fn fail_on(&self, operation: Operation) {
        self.failing
            .lock()
            .expect("failed to acquire `failing` guard")
            .insert(operation);
    }

    /// Lets `pages` listing calls succeed, then fails every following one.
    pub fn fail_listing_after(&self, pages: usize) {
        *self
            .fail_listing_after
            .lock()
            .expect("failed to acquire `fail_listing_after` guard") = Some(pages);
    }

    pub fn insert(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        format: &str,
        content: &[u8],
        created_at: &str,
    ) {
        self.assets
            .lock()
            .expect("failed to acquire `assets` guard")
            .insert(
                (resource_type, public_id.to_string()),
                StoredAsset {
                    format: format.to_string(),
                    content: content.to_vec(),
                    created_at: created_at.to_string(),
                },
            );
    }

    pub fn contains(&self, public_id: &str, resource_type: ResourceType) -> bool {
        self.assets
            .lock()
            .expect("failed to acquire `assets` guard")
            .contains_key(&(resource_type, public_id.to_string()))
    }

    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.list_requests
            .lock()
            .expect("failed to acquire `list_requests` guard")
            .clone()
    }

    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        self.uploaded_files
            .lock()
            .expect("failed to acquire `uploaded_files` guard")
            .clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls
            .lock()
            .expect("failed to acquire `fetched_urls` guard")
            .clone()
    }

    /// `invalidate` flag of every destroy and rename call, in call order.
    pub fn invalidations(&self) -> Vec<(Operation, bool)> {
        self.invalidations
            .lock()
            .expect("failed to acquire `invalidations` guard")
            .clone()
    }

    fn record_invalidation(&self, operation: Operation, invalidate: bool) {
        self.invalidations
            .lock()
            .expect("failed to acquire `invalidations` guard")
            .push((operation, invalidate));
    }

    fn check(&self, operation: Operation) -> Result<(), AssetError> {
        let failing = self.failing.lock().expect("failed to acquire `failing` guard");
        if failing.contains(&operation) {
            return Err(AssetError::Transport(format!(
                "injected failure for {:?}",
                operation
            )));
        }

        Ok(())
    }

    fn descriptor(public_id: &str, resource_type: ResourceType, asset: &StoredAsset) -> Resource {
        let path = format!("{}/{}/{}", resource_type, DELIVERY_UPLOAD, public_id);
        Resource {
            public_id: public_id.to_string(),
            format: asset.format.clone(),
            resource_type: resource_type.to_string(),
            delivery_type: DELIVERY_UPLOAD.to_string(),
            bytes: asset.content.len() as u64,
            created_at: asset.created_at.clone(),
            url: format!("http://mock.local/{}", path),
            secure_url: format!("https://mock.local/{}", path),
        }
    }
}

/// Rough content sniffing standing in for the service's automatic type
/// detection on `resource_type=auto` uploads.
pub fn detect_resource_type(content: &[u8]) -> (ResourceType, &'static str) {
    if content.starts_with(b"\x89PNG") {
        (ResourceType::Image, "png")
    } else if content.starts_with(b"\xFF\xD8\xFF") {
        (ResourceType::Image, "jpg")
    } else if content.starts_with(b"GIF8") {
        (ResourceType::Image, "gif")
    } else if content.starts_with(b"ID3") {
        (ResourceType::Video, "mp3")
    } else if content.len() >= 8 && &content[4..8] == b"ftyp" {
        (ResourceType::Video, "mp4")
    } else {
        (ResourceType::Raw, "")
    }
}

impl adapters::ResourceApi for MockClient {
    fn resource(
        &self,
        public_id: &str,
        resource_type: ResourceType,
    ) -> Result<Resource, AssetError> {
        self.check(Operation::Resource)?;

        let assets = self.assets.lock().expect("failed to acquire `assets` guard");
        assets
            .get(&(resource_type, public_id.to_string()))
            .map(|asset| Self::descriptor(public_id, resource_type, asset))
            .ok_or_else(|| AssetError::NotFound(public_id.to_string()))
    }

    fn resources(&self, request: &ListRequest) -> Result<ResourcePage, AssetError> {
        let served = {
            let mut requests = self
                .list_requests
                .lock()
                .expect("failed to acquire `list_requests` guard");
            requests.push(request.clone());
            requests.len() - 1
        };

        self.check(Operation::Resources)?;
        if let Some(limit) = *self
            .fail_listing_after
            .lock()
            .expect("failed to acquire `fail_listing_after` guard")
        {
            if served >= limit {
                return Err(AssetError::Transport("injected listing failure".to_string()));
            }
        }

        if let Some(delivery_type) = &request.delivery_type {
            if delivery_type != DELIVERY_UPLOAD {
                return Ok(ResourcePage::default());
            }
        }

        let assets = self.assets.lock().expect("failed to acquire `assets` guard");
        let mut matching: Vec<Resource> = assets
            .iter()
            .filter(|((rt, public_id), _)| {
                *rt == request.resource_type
                    && request
                        .prefix
                        .as_deref()
                        .map_or(true, |prefix| public_id.starts_with(prefix))
            })
            .map(|((rt, public_id), asset)| Self::descriptor(public_id, *rt, asset))
            .collect();
        matching.sort_by(|a, b| a.public_id.cmp(&b.public_id));

        let offset = match &request.next_cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| AssetError::Api {
                    status: 400,
                    message: format!("invalid cursor: {}", cursor),
                })?,
            None => 0,
        };
        let page_size = request.max_results.max(1) as usize;
        let end = (offset + page_size).min(matching.len());

        let resources = matching
            .get(offset..end)
            .map(|page| page.to_vec())
            .unwrap_or_default();
        let next_cursor = if end < matching.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(ResourcePage {
            resources,
            next_cursor,
        })
    }
}

impl adapters::Uploader for MockClient {
    fn upload(&self, file: &Path, request: &UploadRequest) -> Result<UploadResponse, AssetError> {
        self.uploaded_files
            .lock()
            .expect("failed to acquire `uploaded_files` guard")
            .push(file.to_path_buf());
        self.check(Operation::Upload)?;

        let content = fs::read(file)?;
        let (resource_type, format) = detect_resource_type(&content);
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| AssetError::InvalidTimestamp(err.to_string()))?;

        let bytes = content.len() as u64;
        self.insert(&request.public_id, resource_type, format, &content, &created_at);

        Ok(UploadResponse {
            public_id: request.public_id.clone(),
            bytes,
            format: format.to_string(),
            resource_type: resource_type.to_string(),
            created_at,
            ..Default::default()
        })
    }

    fn destroy(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<DestroyResponse, AssetError> {
        self.record_invalidation(Operation::Destroy, invalidate);
        self.check(Operation::Destroy)?;

        let removed = self
            .assets
            .lock()
            .expect("failed to acquire `assets` guard")
            .remove(&(resource_type, public_id.to_string()));

        let result = if removed.is_some() { "ok" } else { "not found" };
        Ok(DestroyResponse {
            result: result.to_string(),
        })
    }

    fn rename(
        &self,
        from_public_id: &str,
        to_public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<RenameResponse, AssetError> {
        self.record_invalidation(Operation::Rename, invalidate);
        self.check(Operation::Rename)?;

        let mut assets = self.assets.lock().expect("failed to acquire `assets` guard");
        let target = (resource_type, to_public_id.to_string());
        if assets.contains_key(&target) {
            return Err(AssetError::Api {
                status: 400,
                message: format!("resource already exists: {}", to_public_id),
            });
        }

        let asset = assets
            .remove(&(resource_type, from_public_id.to_string()))
            .ok_or_else(|| AssetError::NotFound(from_public_id.to_string()))?;
        let format = asset.format.clone();
        assets.insert(target, asset);

        Ok(RenameResponse {
            public_id: Some(to_public_id.to_string()),
            format,
        })
    }
}

impl adapters::ContentFetcher for MockClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        self.fetched_urls
            .lock()
            .expect("failed to acquire `fetched_urls` guard")
            .push(url.to_string());
        self.check(Operation::Fetch)?;

        let assets = self.assets.lock().expect("failed to acquire `assets` guard");
        assets
            .iter()
            .find(|((rt, public_id), asset)| {
                let resource = Self::descriptor(public_id, *rt, asset);
                resource.url == url || resource.secure_url == url
            })
            .map(|(_, asset)| asset.content.clone())
            .ok_or_else(|| AssetError::NotFound(url.to_string()))
    }
}
