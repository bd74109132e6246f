use std::io;
use std::path::Path;

use thiserror::Error;

use crate::conversation::Attachment;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("{path} is not a supported image format")]
    Unsupported { path: String },
}

/// Loads an image file as an attachment, sniffing the mime hint from the
/// bytes rather than trusting the file extension.
pub fn load_image(path: &Path) -> Result<Attachment, MediaError> {
    let data = std::fs::read(path).map_err(|source| MediaError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let format = image::guess_format(&data).map_err(|_| MediaError::Unsupported {
        path: path.display().to_string(),
    })?;

    Ok(Attachment {
        data,
        mime: format.to_mime_type().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    fn temp_file(prefix: &str, contents: &[u8]) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "gemchat_media_{prefix}_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::write(&path, contents).expect("fixture should write");
        path
    }

    #[test]
    fn png_bytes_get_a_png_mime_hint() {
        let path = temp_file("png", PNG_MAGIC);
        let attachment = load_image(&path).expect("png should load");
        assert_eq!(attachment.mime, "image/png");
        assert_eq!(attachment.data, PNG_MAGIC);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn jpeg_bytes_get_a_jpeg_mime_hint() {
        let path = temp_file("jpeg", JPEG_MAGIC);
        let attachment = load_image(&path).expect("jpeg should load");
        assert_eq!(attachment.mime, "image/jpeg");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let path = temp_file("text", b"just some text");
        let err = load_image(&path).expect_err("text should be rejected");
        assert!(matches!(err, MediaError::Unsupported { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("gemchat_media_does_not_exist.png");
        let err = load_image(&path).expect_err("missing file should fail");
        assert!(matches!(err, MediaError::Read { .. }));
    }
}
