// src/mime.rs

//! Best-effort MIME detection for extracted files
//!
//! Detection is an injectable capability: the extractor holds a
//! [`MimeDetector`] and never cares which one. [`NoopMime`] is the
//! default; [`MagicMime`] matches leading magic bytes for the formats
//! that actually occur in device backups. Detection results only feed
//! the log stream; a wrong or absent answer never affects extraction.

/// Capability interface for content-type detection
pub trait MimeDetector {
    /// Best-effort MIME type for a file, given its leading bytes
    fn detect(&self, header: &[u8]) -> Option<&'static str>;
}

/// Detector that never answers; used when detection is not requested
#[derive(Debug, Default)]
pub struct NoopMime;

impl MimeDetector for NoopMime {
    fn detect(&self, _header: &[u8]) -> Option<&'static str> {
        None
    }
}

/// Magic-byte detector for common backup content
#[derive(Debug, Default)]
pub struct MagicMime;

impl MimeDetector for MagicMime {
    fn detect(&self, header: &[u8]) -> Option<&'static str> {
        // JPEG magic: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }

        // PNG magic: 89 'PNG' CR LF 1A LF
        if header.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("image/png");
        }

        if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
            return Some("image/gif");
        }

        // ISO base media files ("ftyp" at offset 4): HEIC photos,
        // MP4/QuickTime video, M4A audio - distinguished by brand
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            return Some(match &header[8..12] {
                b"heic" | b"heix" | b"mif1" | b"msf1" => "image/heic",
                b"qt  " => "video/quicktime",
                b"M4A " => "audio/mp4",
                _ => "video/mp4",
            });
        }

        // RIFF container with WAVE form type
        if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WAVE" {
            return Some("audio/wav");
        }

        // MP3: ID3 tag or bare MPEG frame sync
        if header.starts_with(b"ID3") || header.starts_with(&[0xFF, 0xFB]) {
            return Some("audio/mpeg");
        }

        if header.starts_with(b"#!AMR") {
            return Some("audio/amr");
        }

        if header.starts_with(b"%PDF") {
            return Some("application/pdf");
        }

        if header.starts_with(b"SQLite format 3\0") {
            return Some("application/vnd.sqlite3");
        }

        if header.starts_with(b"bplist00") {
            return Some("application/x-plist");
        }

        // ZIP magic: PK 03 04
        if header.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some("application/zip");
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE1, 0, 0, 0, 0];
        assert_eq!(MagicMime.detect(&header), Some("image/jpeg"));
    }

    #[test]
    fn test_detect_png() {
        let header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(MagicMime.detect(&header), Some("image/png"));
    }

    #[test]
    fn test_detect_heic_brand() {
        let mut header = [0u8; 16];
        header[4..8].copy_from_slice(b"ftyp");
        header[8..12].copy_from_slice(b"heic");
        assert_eq!(MagicMime.detect(&header), Some("image/heic"));
    }

    #[test]
    fn test_detect_quicktime_brand() {
        let mut header = [0u8; 16];
        header[4..8].copy_from_slice(b"ftyp");
        header[8..12].copy_from_slice(b"qt  ");
        assert_eq!(MagicMime.detect(&header), Some("video/quicktime"));
    }

    #[test]
    fn test_detect_sqlite() {
        let header = b"SQLite format 3\0more";
        assert_eq!(MagicMime.detect(header), Some("application/vnd.sqlite3"));
    }

    #[test]
    fn test_detect_binary_plist() {
        assert_eq!(
            MagicMime.detect(b"bplist00whatever"),
            Some("application/x-plist")
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(MagicMime.detect(&[0x00, 0x01, 0x02, 0x03]), None);
        assert_eq!(MagicMime.detect(&[]), None);
    }

    #[test]
    fn test_noop_never_answers() {
        let header = [0xFF, 0xD8, 0xFF, 0xE1];
        assert_eq!(NoopMime.detect(&header), None);
    }
}
