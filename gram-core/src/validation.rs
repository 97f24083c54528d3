use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{GramError, GramResult};

/// Declared types a picked file may carry.
pub const ALLOWED_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// Shown whenever a selection is not an allowed image.
pub const INVALID_TYPE_MESSAGE: &str = "Please select an image file (png or jpeg)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Png,
    Jpeg,
}

impl ImageType {
    /// Exact match on the declared MIME type; no sniffing, no parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageType::Png),
            "image/jpeg" => Some(ImageType::Jpeg),
            _ => None,
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            ImageType::Png => ALLOWED_TYPES[0],
            ImageType::Jpeg => ALLOWED_TYPES[1],
        }
    }
}

/// What the file picker hands over
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Bytes,
}

impl PickedFile {
    pub fn new<N, T, B>(name: N, declared_type: T, bytes: B) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        B: Into<Bytes>,
    {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// A picked file that passed validation. Only [`validate`] builds one.
#[derive(Debug, Clone)]
pub struct ImageFile {
    name: String,
    image_type: ImageType,
    bytes: Bytes,
}

impl ImageFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check a picker selection against the allow-list.
///
/// No selection and any declared type outside [`ALLOWED_TYPES`] both yield
/// [`INVALID_TYPE_MESSAGE`].
pub fn validate(picked: Option<PickedFile>) -> GramResult<ImageFile> {
    let Some(picked) = picked else {
        return Err(GramError::unsupported_media_type(INVALID_TYPE_MESSAGE));
    };

    let Some(image_type) = ImageType::from_mime(&picked.declared_type) else {
        return Err(GramError::unsupported_media_type(INVALID_TYPE_MESSAGE));
    };

    if picked.name.trim().is_empty() {
        crate::bail_gram!(bad_request, "Selected file has no name");
    }

    Ok(ImageFile {
        name: picked.name,
        image_type,
        bytes: picked.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn png_and_jpeg_pass() {
        let png = validate(Some(PickedFile::new("photo.png", "image/png", vec![1u8, 2]))).unwrap();
        assert_eq!(png.image_type(), ImageType::Png);
        assert_eq!(png.size_bytes(), 2);

        let jpg = validate(Some(PickedFile::new("a.jpg", "image/jpeg", Vec::<u8>::new()))).unwrap();
        assert_eq!(jpg.image_type().as_mime(), "image/jpeg");
    }

    #[test]
    fn everything_else_gets_the_message() {
        for declared in ["video/mp4", "image/gif", "image/PNG", "image/png; q=1", ""] {
            let err = validate(Some(PickedFile::new("clip.mp4", declared, vec![0u8]))).unwrap_err();
            assert_eq!(err.kind, ErrorKind::UnsupportedMediaType);
            assert_eq!(err.message, INVALID_TYPE_MESSAGE);
        }
    }

    #[test]
    fn no_selection_gets_the_message() {
        let err = validate(None).unwrap_err();
        assert_eq!(err.message, INVALID_TYPE_MESSAGE);
    }

    #[test]
    fn unnamed_file_is_rejected() {
        let err = validate(Some(PickedFile::new("  ", "image/png", vec![0u8]))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }
}
