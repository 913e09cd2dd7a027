//! Exercises a live account. Every test returns early unless
//! CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY, CLOUDINARY_API_SECRET and
//! CLOUDINARY_CAFILE are set.

use std::sync::Arc;

use assetfs::{logging::TracingLogger, Adapter, AssetStore, Config};

const PREFIX: &str = "assetfs-remote-test";

fn store() -> Option<AssetStore> {
    let config = match Config::from_env() {
        Ok(config) if config.ca_file.is_some() => config,
        _ => {
            eprintln!("skipping: CLOUDINARY_* variables are not defined");
            return None;
        }
    };

    let mut store = AssetStore::connect(config).expect("failed to connect");
    store.set_logger(Arc::new(TracingLogger));
    Some(store)
}

/// Tiny but valid 1x1 PNG.
fn image() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

fn cleanup(store: &AssetStore) {
    for key in store.keys() {
        if key.starts_with(PREFIX) {
            store.delete(&key);
        }
    }
}

#[test]
fn test_remote_write_read() {
    let Some(store) = store() else { return };
    let key = format!("{}/read/test-image.png", PREFIX);
    let content = image();

    // Images may be re-encoded on the way in, so only presence is checked.
    assert!(store.write(&key, &content).is_some());
    assert!(store.read(&key).is_some());
    assert!(store.exists(&key));
    assert!(store.mtime(&key).is_some());
    assert!(store.is_directory(&format!("{}/read", PREFIX)));

    cleanup(&store);
}

#[test]
fn test_remote_rename_delete() {
    let Some(store) = store() else { return };
    let source = format!("{}/rename/test-image.png", PREFIX);
    let target = format!("{}/rename/rename-image.png", PREFIX);

    store.write(&source, &image()).expect("write failed");

    assert!(store.rename(&source, &target));
    assert!(!store.exists(&source));
    assert!(store.exists(&target));

    assert!(store.delete(&target));
    assert!(!store.exists(&target));

    cleanup(&store);
}

#[test]
fn test_remote_raw_round_trip() {
    let Some(store) = store() else { return };
    let key = format!("{}/raw/notes.txt", PREFIX);
    let content = b"raw assets are delivered byte for byte".to_vec();

    assert!(store.write(&key, &content).is_some());
    assert_eq!(store.read(&key), Some(content));

    // Raw assets are not enumerated by keys(), so cleanup() misses them.
    assert!(store.delete(&key));
}
