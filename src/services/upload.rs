//! Image uploads into the object store

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::storage::ObjectStore;

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FILES: usize = 10;

const ALLOWED_MIME: [&str; 5] = ["image/png", "image/jpeg", "image/jpg", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
}

/// File part read from a multipart body.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime: String,
    pub body: Bytes,
}

pub fn check_file(file: &IncomingFile) -> Result<()> {
    if !ALLOWED_MIME.contains(&file.mime.to_ascii_lowercase().as_str()) {
        return Err(ApiError::BadRequest(
            "Invalid file type. Only PNG, JPEG, GIF and WEBP images are allowed".into(),
        ));
    }
    if file.body.len() > MAX_FILE_BYTES {
        return Err(ApiError::BadRequest("File too large. Maximum size is 10MB".into()));
    }
    Ok(())
}

/// `<unix-millis>-<name>` with the name lower-cased and whitespace runs replaced by `-`.
pub fn object_key(name: &str, millis: i64) -> String {
    let cleaned = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    format!("{millis}-{cleaned}")
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Last path segment of a stored file's URL.
pub fn key_from_url(url: &str) -> Result<&str> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ApiError::BadRequest("Invalid file URL".into())),
    }
}

pub async fn store_file(store: &dyn ObjectStore, file: IncomingFile) -> Result<UploadedFile> {
    check_file(&file)?;
    let key = object_key(&file.name, Utc::now().timestamp_millis());
    let url = store.put(&key, file.body, content_type_for(&file.name)).await?;
    Ok(UploadedFile { url, filename: key })
}

pub async fn store_files(store: &dyn ObjectStore, files: Vec<IncomingFile>) -> Result<Vec<UploadedFile>> {
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".into()));
    }
    if files.len() > MAX_FILES {
        return Err(ApiError::BadRequest(format!("At most {MAX_FILES} files can be uploaded at once")));
    }
    for file in &files {
        check_file(file)?;
    }
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        uploaded.push(store_file(store, file).await?);
    }
    Ok(uploaded)
}

pub async fn delete_file(store: &dyn ObjectStore, url: &str) -> Result<()> {
    let key = key_from_url(url)?;
    store.delete(key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn png(name: &str) -> IncomingFile {
        IncomingFile { name: name.into(), mime: "image/png".into(), body: Bytes::from_static(b"\x89PNG") }
    }

    #[test]
    fn test_object_key_normalises_name() {
        assert_eq!(object_key("My Holiday  Photo.PNG", 1700000000000), "1700000000000-my-holiday-photo.png");
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(key_from_url("https://b.s3.eu-west-1.amazonaws.com/17-a.png").unwrap(), "17-a.png");
        assert!(key_from_url("https://b.s3.eu-west-1.amazonaws.com/").is_err());
        assert!(key_from_url("").is_err());
    }

    #[test]
    fn test_rejects_non_image() {
        let file = IncomingFile { name: "x.pdf".into(), mime: "application/pdf".into(), body: Bytes::new() };
        assert!(matches!(check_file(&file), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_rejects_oversized() {
        let mut file = png("big.png");
        file.body = Bytes::from(vec![0u8; MAX_FILE_BYTES + 1]);
        assert!(check_file(&file).is_err());
    }

    #[tokio::test]
    async fn test_store_and_delete() {
        let store = MemoryStore::default();
        let uploaded = store_file(&store, png("cat.png")).await.unwrap();
        assert!(uploaded.filename.ends_with("-cat.png"));
        assert_eq!(store.objects.lock().unwrap().get(&uploaded.filename).unwrap().1, "image/png");

        delete_file(&store, &uploaded.url).await.unwrap();
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_files_limits() {
        let store = MemoryStore::default();
        assert!(store_files(&store, vec![]).await.is_err());
        let many = (0..11).map(|i| png(&format!("{i}.png"))).collect();
        assert!(store_files(&store, many).await.is_err());
        let two = store_files(&store, vec![png("a.png"), png("b.png")]).await.unwrap();
        assert_eq!(two.len(), 2);
    }
}
