//! HTTP client for the Cloudinary admin and upload APIs.
//!
//! Admin calls authenticate with HTTP basic auth; upload calls carry a
//! signature over their parameters. Requests run on `reqwest` and are driven
//! to completion synchronously through `util::poll::Poller`.

use std::{collections::BTreeMap, fs, path::Path};

use reqwest::{
    multipart::{Form, Part},
    Certificate, Client, Response,
};
use serde::de::DeserializeOwned;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    adapters,
    config::{Config, SignatureAlgorithm},
    model::{
        cloudinary::{
            ApiErrorBody, DestroyResponse, ListRequest, RenameResponse, Resource, ResourcePage,
            UploadRequest, UploadResponse, DELIVERY_UPLOAD, MAX_PAGE_SIZE, UPLOAD_RESOURCE_TYPE,
        },
        fs::{AssetError, ResourceType},
    },
    util::poll::Poller,
};

/// Parameters never included in an upload API signature.
const UNSIGNED_PARAMS: [&str; 4] = ["file", "resource_type", "api_key", "cloud_name"];

pub struct CloudinaryClient {
    config: Config,
    api: Client,
    delivery: Client,
    poller: Poller,
}

impl CloudinaryClient {
    pub fn new(config: Config) -> Result<Self, AssetError> {
        config.validate()?;

        let api = Client::builder()
            .build()
            .map_err(|err| AssetError::Config(format!("failed to build api client: {}", err)))?;
        let delivery = build_delivery_client(&config)?;
        let poller = Poller::new()
            .map_err(|err| AssetError::Config(format!("failed to start runtime: {}", err)))?;

        Ok(Self {
            config,
            api,
            delivery,
            poller,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name,
            path
        )
    }

    /// Adds `timestamp`, `signature` and `api_key` to `params`.
    fn sign_params(&self, params: &mut BTreeMap<String, String>) {
        let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
        params.insert("timestamp".to_string(), timestamp.to_string());

        let signature = api_sign_request(
            params,
            &self.config.api_secret,
            self.config.signature_algorithm,
        );
        params.insert("signature".to_string(), signature);
        params.insert("api_key".to_string(), self.config.api_key.clone());
    }

    fn post_signed<T: DeserializeOwned + Send>(
        &self,
        action: &str,
        resource_type: ResourceType,
        mut params: BTreeMap<String, String>,
    ) -> Result<T, AssetError> {
        self.sign_params(&mut params);
        let url = self.endpoint(&format!("{}/{}", resource_type, action));

        self.poller.poll_until_ready_error(async {
            let resp = self.api.post(&url).form(&params).send().await?;
            decode_response(resp).await
        })
    }
}

impl adapters::ResourceApi for CloudinaryClient {
    fn resource(
        &self,
        public_id: &str,
        resource_type: ResourceType,
    ) -> Result<Resource, AssetError> {
        let url = self.endpoint(&format!(
            "resources/{}/{}/{}",
            resource_type,
            DELIVERY_UPLOAD,
            encode_public_id(public_id)
        ));

        let resource: Resource = self.poller.poll_until_ready_error(async {
            let resp = self
                .api
                .get(&url)
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .send()
                .await?;
            decode_response(resp).await
        })?;

        debug!(public_id = %public_id, resource_type = %resource_type, "resource found");
        Ok(resource)
    }

    fn resources(&self, request: &ListRequest) -> Result<ResourcePage, AssetError> {
        let path = match &request.delivery_type {
            Some(delivery_type) => format!("resources/{}/{}", request.resource_type, delivery_type),
            None => format!("resources/{}", request.resource_type),
        };
        let url = self.endpoint(&path);

        let mut query = vec![(
            "max_results",
            request.max_results.clamp(1, MAX_PAGE_SIZE).to_string(),
        )];
        if let Some(prefix) = &request.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if let Some(cursor) = &request.next_cursor {
            query.push(("next_cursor", cursor.clone()));
        }

        let page: ResourcePage = self.poller.poll_until_ready_error(async {
            let resp = self
                .api
                .get(&url)
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .query(&query)
                .send()
                .await?;
            decode_response(resp).await
        })?;

        debug!(
            count = page.resources.len(),
            has_more = page.next_cursor.is_some(),
            "listed resources"
        );
        Ok(page)
    }
}

impl adapters::Uploader for CloudinaryClient {
    fn upload(&self, file: &Path, request: &UploadRequest) -> Result<UploadResponse, AssetError> {
        let content = fs::read(file)?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut params = BTreeMap::new();
        params.insert("public_id".to_string(), request.public_id.clone());
        self.sign_params(&mut params);

        let mut form = Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        form = form.part("file", Part::bytes(content).file_name(file_name));

        let url = self.endpoint(&format!("{}/upload", UPLOAD_RESOURCE_TYPE));
        let response: UploadResponse = self.poller.poll_until_ready_error(async {
            let resp = self.api.post(&url).multipart(form).send().await?;
            decode_response(resp).await
        })?;

        debug!(public_id = %response.public_id, bytes = response.bytes, "upload complete");
        Ok(response)
    }

    fn destroy(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<DestroyResponse, AssetError> {
        let mut params = BTreeMap::new();
        params.insert("public_id".to_string(), public_id.to_string());
        params.insert("invalidate".to_string(), invalidate.to_string());

        let response: DestroyResponse = self.post_signed("destroy", resource_type, params)?;

        debug!(public_id = %public_id, result = %response.result, "destroy complete");
        Ok(response)
    }

    fn rename(
        &self,
        from_public_id: &str,
        to_public_id: &str,
        resource_type: ResourceType,
        invalidate: bool,
    ) -> Result<RenameResponse, AssetError> {
        let mut params = BTreeMap::new();
        params.insert("from_public_id".to_string(), from_public_id.to_string());
        params.insert("to_public_id".to_string(), to_public_id.to_string());
        params.insert("invalidate".to_string(), invalidate.to_string());

        let response: RenameResponse = self.post_signed("rename", resource_type, params)?;

        debug!(from = %from_public_id, to = %to_public_id, "rename complete");
        Ok(response)
    }
}

impl adapters::ContentFetcher for CloudinaryClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let bytes = self.poller.poll_until_ready_error(async {
            let resp = self.delivery.get(url).send().await?;

            let status = resp.status();
            if status.as_u16() == 404 {
                return Err(AssetError::NotFound(url.to_string()));
            }
            if !status.is_success() {
                return Err(AssetError::Api {
                    status: status.as_u16(),
                    message: format!("failed to fetch {}", url),
                });
            }

            Ok::<_, AssetError>(resp.bytes().await?)
        })?;

        Ok(bytes.to_vec())
    }
}

/// Builds the client used for content reads. With a CA file configured only
/// the certificates in that file are trusted.
fn build_delivery_client(config: &Config) -> Result<Client, AssetError> {
    let mut builder = Client::builder();

    if let Some(ca_file) = &config.ca_file {
        let pem = fs::read(ca_file).map_err(|err| {
            AssetError::Config(format!("failed to read ca file {}: {}", ca_file.display(), err))
        })?;
        let certs = Certificate::from_pem_bundle(&pem).map_err(|err| {
            AssetError::Config(format!("invalid ca file {}: {}", ca_file.display(), err))
        })?;
        if certs.is_empty() {
            return Err(AssetError::Config(format!(
                "no certificate found in ca file {}",
                ca_file.display()
            )));
        }

        builder = builder.tls_built_in_root_certs(false);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder
        .build()
        .map_err(|err| AssetError::Config(format!("failed to build delivery client: {}", err)))
}

async fn decode_response<T: DeserializeOwned + Send>(resp: Response) -> Result<T, AssetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|err| err.error.message)
        .unwrap_or(body);

    if status.as_u16() == 404 {
        Err(AssetError::NotFound(message))
    } else {
        Err(AssetError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Percent-encodes each segment of a public id, keeping `/` separators.
fn encode_public_id(public_id: &str) -> String {
    public_id
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Signature of an upload API call: hex digest of the sorted, `&`-joined
/// `key=value` pairs followed by the API secret.
pub fn api_sign_request(
    params: &BTreeMap<String, String>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let to_sign = params
        .iter()
        .filter(|(key, value)| !UNSIGNED_PARAMS.contains(&key.as_str()) && !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let payload = format!("{}{}", to_sign, api_secret);

    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}
