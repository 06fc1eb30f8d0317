use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Largest accepted photo, in bytes.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    #[error("No file selected")]
    Empty,

    #[error("File size too large. Please select an image under 5MB.")]
    TooLarge { size: usize },

    #[error("Please select an image file")]
    NotAnImage { mime: String },
}

/// Encodes an uploaded image as a `data:` URL.
///
/// The MIME type comes from the declared content type when present, otherwise
/// it is guessed from the file name.
pub fn photo_data_url(
    bytes: &[u8],
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, PhotoError> {
    if bytes.is_empty() {
        return Err(PhotoError::Empty);
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(PhotoError::TooLarge { size: bytes.len() });
    }

    let mime = content_type
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| {
            file_name
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_default();

    if !mime.starts_with("image/") {
        return Err(PhotoError::NotAnImage { mime });
    }

    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
