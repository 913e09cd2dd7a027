use crate::model::fs::ResourceType;

/// Splits a key into its directory part (if any) and its file name.
///
/// Trailing separators are ignored, so `a/b/` names the file `b` in `a`.
/// A directory part of `.` is the current directory and counts as none.
fn split_key(key: &str) -> (Option<&str>, &str) {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) if &trimmed[..pos] == "." => (None, &trimmed[pos + 1..]),
        Some(pos) => (Some(&trimmed[..pos]), &trimmed[pos + 1..]),
        None => (None, trimmed),
    }
}

/// Position of the dot that starts the extension of `name`, if it has one.
/// A leading dot marks a hidden file, not an extension.
fn extension_dot(name: &str) -> Option<usize> {
    match name.rfind('.') {
        Some(pos) if pos > 0 => Some(pos),
        _ => None,
    }
}

pub fn extension(key: &str) -> Option<&str> {
    let (_, name) = split_key(key);
    extension_dot(name).map(|pos| &name[pos + 1..])
}

/// Public identifier of `key` on the remote service: the key with its last
/// extension removed. `abcd.jpg.jpg` and `abcd.jpg.png` both map to
/// `abcd.jpg`.
pub fn compute_remote_path(key: &str) -> String {
    let (dir, name) = split_key(key);
    let stem = match extension_dot(name) {
        Some(pos) => &name[..pos],
        None => name,
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, stem),
        None => stem.to_string(),
    }
}

/// Prefix every asset "inside" `key` shares when `key` is read as a directory.
pub fn directory_prefix(key: &str) -> String {
    format!("{}/", compute_remote_path(key).trim_end_matches('/'))
}

/// Logical key rebuilt from a listed resource.
pub fn logical_key(public_id: &str, format: &str) -> String {
    format!("{}.{}", public_id, format)
}

pub fn compute_resource_type(key: &str) -> ResourceType {
    match extension(key) {
        Some(ext) => resource_type_for_extension(ext),
        None => ResourceType::Image,
    }
}

pub fn resource_type_for_extension(ext: &str) -> ResourceType {
    match ext {
        // text and markup
        "txt" | "htm" | "html" | "php" | "css" | "js" | "json" | "xml" | "swf" => ResourceType::Raw,

        // archives and executables
        "zip" | "rar" | "exe" | "msi" | "cab" => ResourceType::Raw,

        // adobe
        "pdf" | "ai" | "eps" | "ps" => ResourceType::Raw,
        "psd" => ResourceType::Image,

        // office documents
        "doc" | "docx" | "rtf" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "ods" => {
            ResourceType::Raw
        }

        // audio is stored alongside video
        "flv" | "mp3" | "qt" | "mov" | "mp4" => ResourceType::Video,

        "png" | "jpe" | "jpeg" | "jpg" | "gif" | "bmp" | "ico" | "tiff" | "tif" | "svg"
        | "svgz" => ResourceType::Image,

        _ => ResourceType::Image,
    }
}
