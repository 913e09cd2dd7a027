use std::{io::Write, sync::Arc};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info, span, Level};

use crate::{
    adapters::{cloudinary::CloudinaryClient, AssetClient},
    config::Config,
    logging::{Logger, NullLogger},
    model::{
        cloudinary::{ListRequest, UploadRequest, DELIVERY_UPLOAD},
        fs::{AssetError, ResourceType},
    },
    util::path::{compute_remote_path, compute_resource_type, directory_prefix, logical_key},
};

/// Page size used when enumerating keys.
pub const LIST_PAGE_SIZE: u32 = 200;

/// Filesystem contract consumed by generic filesystem facades.
///
/// Implementations never panic or propagate errors: failures come back as
/// `None`, `false` or an empty list.
pub trait Adapter {
    fn read(&self, key: &str) -> Option<Vec<u8>>;

    /// Returns the number of bytes the backend reports as stored.
    fn write(&self, key: &str, content: &[u8]) -> Option<u64>;

    fn exists(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    /// Creation time of `key` in unix seconds.
    fn mtime(&self, key: &str) -> Option<i64>;

    fn delete(&self, key: &str) -> bool;

    fn rename(&self, source_key: &str, target_key: &str) -> bool;

    fn is_directory(&self, key: &str) -> bool;
}

/// Exposes a remote asset store as a key-addressed filesystem.
///
/// Keys map to public ids by dropping their last extension (see
/// `util::path::compute_remote_path`); the extension also picks the resource
/// type lookups are scoped to.
pub struct AssetStore {
    client: Arc<dyn AssetClient>,
    secure: bool,
    logger: Arc<dyn Logger>,
}

impl AssetStore {
    /// Builds the HTTP client for `config`. Configuration problems are
    /// returned here rather than collapsed like operation failures.
    pub fn connect(config: Config) -> Result<Self, AssetError> {
        let secure = config.ca_file.is_some();
        let client = CloudinaryClient::new(config)?;

        Ok(Self::new(Arc::new(client), secure))
    }

    /// `secure` selects the secure delivery URL for reads.
    pub fn new(client: Arc<dyn AssetClient>, secure: bool) -> Self {
        Self {
            client,
            secure,
            logger: Arc::new(NullLogger),
        }
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    pub fn try_read(&self, key: &str) -> Result<Vec<u8>, AssetError> {
        let resource = self
            .client
            .resource(&compute_remote_path(key), compute_resource_type(key))?;

        let url = if self.secure {
            &resource.secure_url
        } else {
            &resource.url
        };

        self.client.fetch(url)
    }

    pub fn try_write(&self, key: &str, content: &[u8]) -> Result<u64, AssetError> {
        // Removed when dropped, including on early return.
        let mut tmp = tempfile::Builder::new().prefix("assetfs-").tempfile()?;
        tmp.write_all(content)?;
        tmp.flush()?;

        let request = UploadRequest {
            public_id: compute_remote_path(key),
        };
        let response = self.client.upload(tmp.path(), &request)?;

        debug!(public_id = %response.public_id, bytes = response.bytes, "stored");
        Ok(response.bytes)
    }

    pub fn try_exists(&self, key: &str) -> Result<bool, AssetError> {
        match self
            .client
            .resource(&compute_remote_path(key), compute_resource_type(key))
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Keys of every image asset. Video and raw assets are not enumerated.
    pub fn try_keys(&self) -> Result<Vec<String>, AssetError> {
        let mut keys = Vec::new();
        let mut request = ListRequest::new(ResourceType::Image);
        request.max_results = LIST_PAGE_SIZE;

        loop {
            let page = self.client.resources(&request)?;
            keys.extend(
                page.resources
                    .iter()
                    .map(|resource| logical_key(&resource.public_id, &resource.format)),
            );

            match page.next_cursor {
                Some(cursor) if !cursor.is_empty() => request.next_cursor = Some(cursor),
                _ => break,
            }
        }

        Ok(keys)
    }

    pub fn try_mtime(&self, key: &str) -> Result<i64, AssetError> {
        let resource = self
            .client
            .resource(&compute_remote_path(key), compute_resource_type(key))?;

        parse_timestamp(&resource.created_at)
    }

    pub fn try_delete(&self, key: &str) -> Result<bool, AssetError> {
        let response =
            self.client
                .destroy(&compute_remote_path(key), compute_resource_type(key), true)?;

        Ok(response.result == "ok")
    }

    pub fn try_rename(&self, source_key: &str, target_key: &str) -> Result<bool, AssetError> {
        let target = compute_remote_path(target_key);
        let response = self.client.rename(
            &compute_remote_path(source_key),
            &target,
            compute_resource_type(source_key),
            true,
        )?;

        Ok(response.public_id.as_deref() == Some(target.as_str()))
    }

    /// True when at least one uploaded image lives under `key/`. Empty
    /// directories do not exist on the remote side.
    pub fn try_is_directory(&self, key: &str) -> Result<bool, AssetError> {
        let mut request = ListRequest::new(ResourceType::Image);
        request.delivery_type = Some(DELIVERY_UPLOAD.to_string());
        request.prefix = Some(directory_prefix(key));
        request.max_results = 1;

        let page = self.client.resources(&request)?;
        Ok(!page.resources.is_empty())
    }

    fn report(&self, operation: &str, key: &str, err: &AssetError) {
        self.logger
            .error(&format!("{} failed for {}: {}", operation, key, err));
    }
}

impl Adapter for AssetStore {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        let span = span!(Level::INFO, "read", context = "read");
        let _e = span.enter();
        info!(key = key, secure = self.secure, "called");

        self.try_read(key)
            .map_err(|err| self.report("read", key, &err))
            .ok()
    }

    fn write(&self, key: &str, content: &[u8]) -> Option<u64> {
        let span = span!(Level::INFO, "write", context = "write");
        let _e = span.enter();
        info!(key = key, size = content.len(), "called");

        self.try_write(key, content)
            .map_err(|err| self.report("write", key, &err))
            .ok()
    }

    fn exists(&self, key: &str) -> bool {
        let span = span!(Level::INFO, "exists", context = "exists");
        let _e = span.enter();
        info!(key = key, "called");

        self.try_exists(key).unwrap_or_else(|err| {
            self.report("exists", key, &err);
            false
        })
    }

    fn keys(&self) -> Vec<String> {
        let span = span!(Level::INFO, "keys", context = "keys");
        let _e = span.enter();
        info!("called");

        self.try_keys().unwrap_or_else(|err| {
            self.report("keys", "*", &err);
            Vec::new()
        })
    }

    fn mtime(&self, key: &str) -> Option<i64> {
        let span = span!(Level::INFO, "mtime", context = "mtime");
        let _e = span.enter();
        info!(key = key, "called");

        self.try_mtime(key)
            .map_err(|err| self.report("mtime", key, &err))
            .ok()
    }

    fn delete(&self, key: &str) -> bool {
        let span = span!(Level::INFO, "delete", context = "delete");
        let _e = span.enter();
        info!(key = key, "called");

        self.try_delete(key).unwrap_or_else(|err| {
            self.report("delete", key, &err);
            false
        })
    }

    fn rename(&self, source_key: &str, target_key: &str) -> bool {
        let span = span!(Level::INFO, "rename", context = "rename");
        let _e = span.enter();
        info!(source_key = source_key, target_key = target_key, "called");

        self.try_rename(source_key, target_key).unwrap_or_else(|err| {
            self.report("rename", source_key, &err);
            false
        })
    }

    fn is_directory(&self, key: &str) -> bool {
        let span = span!(Level::INFO, "is_directory", context = "is_directory");
        let _e = span.enter();
        info!(key = key, "called");

        self.try_is_directory(key).unwrap_or_else(|err| {
            self.report("is_directory", key, &err);
            false
        })
    }
}

/// Parses an RFC 3339 creation timestamp into unix seconds.
pub fn parse_timestamp(value: &str) -> Result<i64, AssetError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(|t| t.unix_timestamp())
        .map_err(|err| AssetError::InvalidTimestamp(format!("{}: {}", value, err)))
}
