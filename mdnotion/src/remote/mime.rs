//! Content-type detection for uploaded files.
//!
//! The extension decides first; files with an unknown extension are sniffed from their
//! leading bytes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Number of leading bytes inspected when sniffing.
const SNIFF_LEN: usize = 512;

/// Content type of the file at `path`.
pub fn content_type(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
        .or_else(|| sniff_file(path))
        .unwrap_or(OCTET_STREAM)
}

/// Guess the content type from a file extension.
pub fn from_extension(ext: Option<&str>) -> Option<&'static str> {
    let ext = ext?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => return None,
    };
    Some(mime)
}

fn sniff_file(path: &Path) -> Option<&'static str> {
    let file = File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    sniff(&head)
}

/// Recognize a handful of formats by their magic bytes.
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"%PDF-", "application/pdf"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
    ];

    if let Some(&(_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return Some(mime);
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg")) {
        return Some("image/svg+xml");
    }
    None
}
