use crate::domain::{BackendResult, PreviewKind, PreviewResult};
use crate::infra::io_error;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

const PREVIEW_BINARY_SAMPLE_BYTES: usize = 4096;
const IMAGE_MAX_BYTES: u64 = 8 * 1024 * 1024;
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

pub(crate) fn load_preview(path: &Path, max_bytes: usize) -> BackendResult<PreviewResult> {
    let metadata = fs::metadata(path).map_err(|err| io_error(err, path))?;
    if metadata.is_dir() {
        return Ok(PreviewResult::DirectoryMarker);
    }

    if is_image_path(path) {
        if metadata.len() > IMAGE_MAX_BYTES {
            return Ok(PreviewResult::text(format!(
                "Image too large to preview ({} bytes).",
                metadata.len()
            )));
        }
        let bytes = fs::read(path).map_err(|err| io_error(err, path))?;
        return Ok(PreviewResult::FileContent {
            kind: PreviewKind::Image,
            payload: STANDARD.encode(bytes),
        });
    }

    let file_len = metadata.len();
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|file| {
            file.take(max_bytes.max(PREVIEW_BINARY_SAMPLE_BYTES) as u64)
                .read_to_end(&mut bytes)
        })
        .map_err(|err| io_error(err, path))?;

    let sample_len = bytes.len().min(PREVIEW_BINARY_SAMPLE_BYTES);
    if bytes[..sample_len].contains(&0) {
        return Ok(PreviewResult::text("Cannot preview binary file."));
    }

    let limit = utf8_boundary(&bytes, max_bytes);
    let mut text = String::from_utf8_lossy(&bytes[..limit]).to_string();
    if file_len > max_bytes as u64 {
        text.push_str(&format!(
            "\n\n--- preview truncated at {} bytes (file size: {} bytes) ---",
            max_bytes, file_len
        ));
    }
    Ok(PreviewResult::text(text))
}

/// Largest cut at or below `max` that does not split a UTF-8 sequence.
fn utf8_boundary(bytes: &[u8], max: usize) -> usize {
    if bytes.len() <= max {
        return bytes.len();
    }
    let mut cut = max;
    // Continuation bytes look like 0b10xx_xxxx; a sequence is at most 4 bytes long.
    while cut > 0 && max - cut < 3 && (bytes[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    cut
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
