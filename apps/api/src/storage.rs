use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub const MAX_CV_BYTES: usize = 5 * 1024 * 1024;

/// Accepted CV formats: extension and content type.
const CV_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

/// Resolves the extension from the uploaded file name or its content type.
pub fn cv_extension(file_name: Option<&str>, content_type: Option<&str>) -> Option<&'static str> {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .and_then(|ext| CV_TYPES.iter().find(|(e, _)| *e == ext).map(|(e, _)| *e));

    from_name.or_else(|| {
        content_type.and_then(|ct| CV_TYPES.iter().find(|(_, t)| *t == ct).map(|(e, _)| *e))
    })
}

pub fn cv_key(user_id: Uuid, extension: &str) -> String {
    format!("cvs/{}/{}.{}", user_id, Uuid::new_v4(), extension)
}

pub async fn upload_cv(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    user_id: Uuid,
    extension: &str,
    bytes: Vec<u8>,
) -> Result<String, AppError> {
    let key = cv_key(user_id, extension);
    let content_type = CV_TYPES
        .iter()
        .find(|(e, _)| *e == extension)
        .map(|(_, t)| *t)
        .unwrap_or("application/octet-stream");

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("CV upload failed: {e}")))?;

    info!("Uploaded CV to s3://{}/{}", bucket, key);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_name() {
        assert_eq!(cv_extension(Some("Resume.PDF"), None), Some("pdf"));
        assert_eq!(cv_extension(Some("cv.docx"), Some("text/plain")), Some("docx"));
        assert_eq!(cv_extension(Some("cv.exe"), None), None);
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(cv_extension(None, Some("application/msword")), Some("doc"));
        assert_eq!(cv_extension(Some("noext"), Some("image/png")), None);
    }

    #[test]
    fn test_key_layout() {
        let user = Uuid::new_v4();
        let key = cv_key(user, "pdf");
        assert!(key.starts_with(&format!("cvs/{user}/")));
        assert!(key.ends_with(".pdf"));
    }
}
