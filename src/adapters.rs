use std::path::Path;

use crate::model::{
    cloudinary::{
        DestroyResponse, ListRequest, RenameResponse, Resource, ResourcePage, UploadRequest,
        UploadResponse,
    },
    fs::{AssetError, ResourceType},
};

pub mod cloudinary;
pub mod mock;

/// Read side of the remote admin API.
pub trait ResourceApi {
    /// Looks up a single asset. Fails with `AssetError::NotFound` when the
    /// public id does not exist under `resource_type`.
    fn resource(&self, public_id: &str, resource_type: ResourceType)
        -> Result<Resource, AssetError>;

    fn resources(&self, request: &ListRequest) -> Result<ResourcePage, AssetError>;
}

/// Mutating calls of the remote upload API.
pub trait Uploader {
    fn upload(&self, file: &Path, request: &UploadRequest) -> Result<UploadResponse, AssetError>;

    fn destroy(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<DestroyResponse, AssetError>;

    fn rename(
        &self,
        from_public_id: &str,
        to_public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<RenameResponse, AssetError>;
}

/// Downloads delivered content by URL.
pub trait ContentFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Everything the asset store needs from a remote client.
pub trait AssetClient: ResourceApi + Uploader + ContentFetcher + Send + Sync {}

impl<T> AssetClient for T where T: ResourceApi + Uploader + ContentFetcher + Send + Sync {}
