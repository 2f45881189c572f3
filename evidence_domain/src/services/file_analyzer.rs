// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Analyzer
//!
//! Classifies payload bytes into `(category, quality, detected_mime,
//! hashes, metadata)` for evidence attachments:
//!
//! 1. MD5 and SHA-256 over the payload
//! 2. MIME by extension (`mime_guess`), MIME by magic bytes (signature
//!    table; ZIP prefixes are probed in the first 4 KiB for Office
//!    Open XML sub-format markers)
//! 3. Category from detected MIME, then declared MIME, then an
//!    extension-class fallback
//! 4. Quality ladder, first match wins: empty, declared/detected MIME
//!    mismatch, encryption probes, type-specific truncation checks,
//!    suspicious-pattern scan, else valid
//! 5. Light metadata: PDF version from the header, PNG dimensions from
//!    the IHDR chunk
//!
//! Identical bytes always yield identical classification (the
//! `analyzed_at` stamp is the only nondeterministic field). Failures are
//! never fatal: filesystem errors produce a placeholder analysis with
//! `quality = Corrupted` and the error string in `quality_details`.

use chrono::{DateTime, Utc};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const OFFICE_PROBE_WINDOW: usize = 4096;
const ENCRYPTION_PROBE_WINDOW: usize = 4096;
const SUSPICIOUS_SCAN_WINDOW: usize = 8192;
const MIN_ZIP_SIZE: usize = 22;

const OCTET_STREAM: &str = "application/octet-stream";

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// High-level file categories used for review filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Email,
    Document,
    Spreadsheet,
    Presentation,
    Image,
    Video,
    Audio,
    Archive,
    Database,
    Code,
    Unknown,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Email => "email",
            FileCategory::Document => "document",
            FileCategory::Spreadsheet => "spreadsheet",
            FileCategory::Presentation => "presentation",
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Archive => "archive",
            FileCategory::Database => "database",
            FileCategory::Code => "code",
            FileCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data quality assessment for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    /// Intact and processable
    Valid,
    /// Header or structure is damaged
    Corrupted,
    /// Password-protected
    Encrypted,
    /// Incomplete (unexpected EOF)
    Truncated,
    /// Extension does not match content
    InvalidFormat,
    /// Potential malware indicators
    Suspicious,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Valid => "valid",
            DataQuality::Corrupted => "corrupted",
            DataQuality::Encrypted => "encrypted",
            DataQuality::Truncated => "truncated",
            DataQuality::InvalidFormat => "invalid_format",
            DataQuality::Suspicious => "suspicious",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete analysis result for one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub file_size: u64,
    pub extension: String,
    /// MIME guessed from the extension
    pub mime_type: String,
    /// MIME detected from magic bytes, when a signature matched
    pub detected_mime: Option<String>,
    pub category: FileCategory,
    pub quality: DataQuality,
    pub quality_details: String,
    pub is_processable: bool,
    pub md5: String,
    pub sha256: String,
    pub metadata: BTreeMap<String, String>,
    pub supports_text_extraction: bool,
    pub supports_image_preview: bool,
    pub supports_thumbnail: bool,
    pub analyzed_at: DateTime<Utc>,
}

/// Magic-byte signatures checked against the payload prefix; first match
/// wins, so more specific prefixes come first within a family.
const FILE_SIGNATURES: &[(&[u8], &str, FileCategory)] = &[
    // Documents
    (b"%PDF", "application/pdf", FileCategory::Document),
    (
        b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1",
        "application/msword",
        FileCategory::Document,
    ),
    // Images
    (b"\xff\xd8\xff", "image/jpeg", FileCategory::Image),
    (b"\x89PNG\r\n\x1a\n", "image/png", FileCategory::Image),
    (b"GIF87a", "image/gif", FileCategory::Image),
    (b"GIF89a", "image/gif", FileCategory::Image),
    (b"II*\x00", "image/tiff", FileCategory::Image),
    (b"MM\x00*", "image/tiff", FileCategory::Image),
    (b"BM", "image/bmp", FileCategory::Image),
    // Video
    (b"\x00\x00\x00\x18ftypmp42", "video/mp4", FileCategory::Video),
    (b"\x00\x00\x00\x1cftypmp42", "video/mp4", FileCategory::Video),
    // Audio (RIFF covers WAV containers; AVI shares the prefix)
    (b"ID3", "audio/mpeg", FileCategory::Audio),
    (b"\xff\xfb", "audio/mpeg", FileCategory::Audio),
    (b"RIFF", "audio/wav", FileCategory::Audio),
    (b"fLaC", "audio/flac", FileCategory::Audio),
    // Archives (ZIP also covers the Office Open XML family, refined below)
    (b"PK\x03\x04", "application/zip", FileCategory::Archive),
    (b"Rar!", "application/x-rar-compressed", FileCategory::Archive),
    (b"\x1f\x8b", "application/gzip", FileCategory::Archive),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed", FileCategory::Archive),
    // Database
    (b"SQLite format 3", "application/x-sqlite3", FileCategory::Database),
];

fn mime_category(mime: &str) -> Option<FileCategory> {
    let category = match mime {
        "application/pdf" | "application/msword" | "application/rtf" | "text/plain"
        | "text/html" => FileCategory::Document,
        m if m == DOCX_MIME => FileCategory::Document,
        "application/vnd.ms-excel" | "text/csv" => FileCategory::Spreadsheet,
        m if m == XLSX_MIME => FileCategory::Spreadsheet,
        "application/vnd.ms-powerpoint" => FileCategory::Presentation,
        m if m == PPTX_MIME => FileCategory::Presentation,
        "message/rfc822" | "application/vnd.ms-outlook" => FileCategory::Email,
        "image/jpeg" | "image/png" | "image/gif" | "image/bmp" | "image/tiff"
        | "image/svg+xml" | "image/webp" => FileCategory::Image,
        "video/mp4" | "video/mpeg" | "video/quicktime" | "video/x-msvideo"
        | "video/x-matroska" => FileCategory::Video,
        "audio/mpeg" | "audio/wav" | "audio/ogg" | "audio/flac" | "audio/mp4" => {
            FileCategory::Audio
        }
        "application/zip" | "application/x-rar-compressed" | "application/gzip"
        | "application/x-7z-compressed" | "application/x-tar" => FileCategory::Archive,
        "application/x-sqlite3" | "application/vnd.ms-access" => FileCategory::Database,
        _ => return None,
    };
    Some(category)
}

fn extension_category(extension: &str) -> FileCategory {
    match extension {
        ".doc" | ".docx" | ".pdf" | ".txt" | ".rtf" | ".odt" => FileCategory::Document,
        ".xls" | ".xlsx" | ".csv" | ".ods" => FileCategory::Spreadsheet,
        ".ppt" | ".pptx" | ".odp" => FileCategory::Presentation,
        ".jpg" | ".jpeg" | ".png" | ".gif" | ".bmp" | ".tiff" | ".svg" | ".webp" => {
            FileCategory::Image
        }
        ".mp4" | ".avi" | ".mov" | ".mkv" | ".wmv" | ".flv" => FileCategory::Video,
        ".mp3" | ".wav" | ".ogg" | ".flac" | ".m4a" | ".wma" => FileCategory::Audio,
        ".zip" | ".rar" | ".7z" | ".tar" | ".gz" | ".bz2" => FileCategory::Archive,
        ".eml" | ".msg" | ".mbox" => FileCategory::Email,
        ".db" | ".sqlite" | ".mdb" | ".accdb" => FileCategory::Database,
        ".py" | ".java" | ".cpp" | ".js" | ".go" | ".rs" => FileCategory::Code,
        _ => FileCategory::Unknown,
    }
}

/// Analyzes files for type, quality, and processability.
#[derive(Debug, Default)]
pub struct FileAnalyzer;

impl FileAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Reads and analyzes a file on disk. Read failures are folded into a
    /// placeholder analysis rather than propagated.
    pub fn analyze_path(&self, path: &Path) -> FileAnalysis {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        match std::fs::read(path) {
            Ok(data) => self.analyze_bytes(&filename, &data),
            Err(err) => Self::error_analysis(&filename, &err.to_string()),
        }
    }

    /// Analyzes a payload without filesystem access.
    pub fn analyze_bytes(&self, filename: &str, data: &[u8]) -> FileAnalysis {
        let extension = Self::extension_of(filename);

        let md5 = hex::encode(Md5::digest(data));
        let sha256 = hex::encode(Sha256::digest(data));

        let mime_type = mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string();
        let detected_mime = Self::detect_mime_from_magic(data);

        let category = Self::determine_category(&mime_type, detected_mime.as_deref(), &extension);
        let (quality, quality_details) =
            Self::assess_quality(data, &mime_type, detected_mime.as_deref());

        let is_processable =
            matches!(quality, DataQuality::Valid | DataQuality::Suspicious) && !data.is_empty();

        let metadata = Self::extract_metadata(data, category);

        FileAnalysis {
            filename: filename.to_string(),
            file_size: data.len() as u64,
            extension,
            mime_type,
            detected_mime,
            category,
            quality,
            quality_details,
            is_processable,
            md5,
            sha256,
            metadata,
            supports_text_extraction: Self::supports_text_extraction(category, quality),
            supports_image_preview: Self::supports_image_preview(category, quality),
            supports_thumbnail: Self::supports_thumbnail(category, quality),
            analyzed_at: Utc::now(),
        }
    }

    fn extension_of(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    fn detect_mime_from_magic(data: &[u8]) -> Option<String> {
        // ZIP-based Office formats first: probe the head of the archive for
        // the sub-format directory markers.
        if data.starts_with(b"PK\x03\x04") {
            let window = &data[..data.len().min(OFFICE_PROBE_WINDOW)];
            if contains(window, b"word/") {
                return Some(DOCX_MIME.to_string());
            }
            if contains(window, b"xl/") {
                return Some(XLSX_MIME.to_string());
            }
            if contains(window, b"ppt/") {
                return Some(PPTX_MIME.to_string());
            }
        }

        FILE_SIGNATURES
            .iter()
            .find(|(signature, _, _)| data.starts_with(signature))
            .map(|(_, mime, _)| mime.to_string())
    }

    fn determine_category(
        mime_type: &str,
        detected_mime: Option<&str>,
        extension: &str,
    ) -> FileCategory {
        if let Some(category) = detected_mime.and_then(mime_category) {
            return category;
        }
        if let Some(category) = mime_category(mime_type) {
            return category;
        }
        extension_category(extension)
    }

    fn assess_quality(
        data: &[u8],
        mime_type: &str,
        detected_mime: Option<&str>,
    ) -> (DataQuality, String) {
        if data.is_empty() {
            return (DataQuality::Corrupted, "File is empty".to_string());
        }

        if let Some(detected) = detected_mime {
            if mime_type != OCTET_STREAM && !Self::mime_types_compatible(mime_type, detected) {
                return (
                    DataQuality::InvalidFormat,
                    format!("Extension suggests {mime_type} but content is {detected}"),
                );
            }
        }

        if Self::is_encrypted(data) {
            return (
                DataQuality::Encrypted,
                "File appears to be password-protected".to_string(),
            );
        }

        if let Some(detected) = detected_mime {
            if let Some(details) = Self::check_corruption(data, detected) {
                return (DataQuality::Corrupted, details);
            }
        }

        if Self::is_suspicious(data) {
            return (
                DataQuality::Suspicious,
                "File contains suspicious patterns".to_string(),
            );
        }

        (DataQuality::Valid, "File appears intact".to_string())
    }

    /// Compatible when equal, when both are ZIP containers, or when one is
    /// a legacy Office binary and the other its Open XML successor.
    fn mime_types_compatible(declared: &str, detected: &str) -> bool {
        if declared == detected {
            return true;
        }
        let zip_family = ["application/zip", "application/x-zip-compressed"];
        if zip_family.contains(&declared) && zip_family.contains(&detected) {
            return true;
        }
        if declared.contains("officedocument") && detected.contains("ms-") {
            return true;
        }
        if detected.contains("officedocument") && declared.contains("ms-") {
            return true;
        }
        false
    }

    fn is_encrypted(data: &[u8]) -> bool {
        let window = &data[..data.len().min(ENCRYPTION_PROBE_WINDOW)];

        // PDF with an /Encrypt dictionary entry near the head
        if data.starts_with(b"%PDF") && contains(window, b"/Encrypt") {
            return true;
        }

        // Office document encryption wrapper
        if contains(window, b"EncryptedPackage") {
            return true;
        }

        // ZIP general-purpose flag, bit 0 = entries are encrypted
        if data.starts_with(b"PK\x03\x04") && data.len() >= 8 && (data[6] & 0x01) != 0 {
            return true;
        }

        false
    }

    fn check_corruption(data: &[u8], mime_type: &str) -> Option<String> {
        if mime_type == "application/pdf"
            && !data.ends_with(b"%%EOF")
            && !data.ends_with(b"%%EOF\n")
            && !data.ends_with(b"%%EOF\r\n")
        {
            return Some("PDF missing EOF marker (possibly truncated)".to_string());
        }

        if mime_type.contains("zip") && data.len() < MIN_ZIP_SIZE {
            return Some("ZIP file too small (corrupted)".to_string());
        }

        if mime_type == "image/jpeg" && !data.ends_with(b"\xff\xd9") {
            return Some("JPEG missing EOI marker (possibly truncated)".to_string());
        }

        if mime_type == "image/png" && !data.ends_with(b"\x00\x00\x00\x00IEND\xae\x42\x60\x82") {
            return Some("PNG missing IEND chunk (possibly truncated)".to_string());
        }

        None
    }

    fn is_suspicious(data: &[u8]) -> bool {
        const PATTERNS: &[&[u8]] = &[
            b"TVqQAAMAAAAEAAAA", // PE executable in base64
            b"This program cannot be run in DOS mode",
            b"<script", // embedded scripts in non-HTML containers
        ];
        let window = &data[..data.len().min(SUSPICIOUS_SCAN_WINDOW)];
        PATTERNS.iter().any(|pattern| contains(window, pattern))
    }

    fn extract_metadata(data: &[u8], category: FileCategory) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();

        if category == FileCategory::Document && data.starts_with(b"%PDF") {
            metadata.insert("pdf_version".to_string(), Self::pdf_version(data));
        }

        if category == FileCategory::Image {
            if let Some((width, height)) = Self::png_dimensions(data) {
                metadata.insert("width".to_string(), width.to_string());
                metadata.insert("height".to_string(), height.to_string());
            }
        }

        metadata
    }

    fn pdf_version(data: &[u8]) -> String {
        let header: String = data
            .iter()
            .take(20)
            .map(|&b| b as char)
            .filter(|c| c.is_ascii())
            .collect();
        header
            .strip_prefix("%PDF-")
            .map(|rest| rest.chars().take(3).collect())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
        if !data.starts_with(b"\x89PNG") || data.len() < 24 {
            return None;
        }
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        Some((width, height))
    }

    fn supports_text_extraction(category: FileCategory, quality: DataQuality) -> bool {
        quality == DataQuality::Valid
            && matches!(
                category,
                FileCategory::Document
                    | FileCategory::Email
                    | FileCategory::Spreadsheet
                    | FileCategory::Presentation
                    | FileCategory::Code
            )
    }

    fn supports_image_preview(category: FileCategory, quality: DataQuality) -> bool {
        quality == DataQuality::Valid
            && matches!(category, FileCategory::Image | FileCategory::Video)
    }

    fn supports_thumbnail(category: FileCategory, quality: DataQuality) -> bool {
        quality == DataQuality::Valid
            && matches!(
                category,
                FileCategory::Image
                    | FileCategory::Video
                    | FileCategory::Document
                    | FileCategory::Presentation
            )
    }

    /// Placeholder analysis for a payload that could not be read at all.
    fn error_analysis(filename: &str, error: &str) -> FileAnalysis {
        FileAnalysis {
            filename: filename.to_string(),
            file_size: 0,
            extension: Self::extension_of(filename),
            mime_type: OCTET_STREAM.to_string(),
            detected_mime: None,
            category: FileCategory::Unknown,
            quality: DataQuality::Corrupted,
            quality_details: format!("Analysis failed: {error}"),
            is_processable: false,
            md5: String::new(),
            sha256: String::new(),
            metadata: BTreeMap::new(),
            supports_text_extraction: false,
            supports_image_preview: false,
            supports_thumbnail: false,
            analyzed_at: Utc::now(),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyze(filename: &str, data: &[u8]) -> FileAnalysis {
        FileAnalyzer::new().analyze_bytes(filename, data)
    }

    #[test]
    fn test_empty_payload_is_corrupted() {
        let analysis = analyze("empty.pdf", b"");
        assert_eq!(analysis.quality, DataQuality::Corrupted);
        assert_eq!(analysis.quality_details, "File is empty");
        assert!(!analysis.is_processable);
    }

    #[test]
    fn test_valid_pdf() {
        let data = b"%PDF-1.4\nsome objects\n%%EOF";
        let analysis = analyze("report.pdf", data);
        assert_eq!(analysis.category, FileCategory::Document);
        assert_eq!(analysis.quality, DataQuality::Valid);
        assert_eq!(analysis.detected_mime.as_deref(), Some("application/pdf"));
        assert_eq!(analysis.metadata.get("pdf_version").unwrap(), "1.4");
        assert!(analysis.is_processable);
        assert!(analysis.supports_text_extraction);
    }

    #[test]
    fn test_truncated_pdf_mentions_eof() {
        let data = b"%PDF-1.4\n...no terminator";
        let analysis = analyze("report.pdf", data);
        assert_eq!(analysis.category, FileCategory::Document);
        assert_eq!(analysis.quality, DataQuality::Corrupted);
        assert!(analysis.quality_details.contains("EOF"));
        assert!(!analysis.is_processable);
    }

    #[test]
    fn test_encrypted_pdf() {
        let data = b"%PDF-1.7\n/Encrypt 12 0 R\n%%EOF";
        let analysis = analyze("sealed.pdf", data);
        assert_eq!(analysis.quality, DataQuality::Encrypted);
        assert!(!analysis.is_processable);
    }

    #[test]
    fn test_encrypted_office_package() {
        // ZIP prefix with the OOXML marker and the CDFV2 encryption wrapper
        // token inside the probe window.
        let mut data = b"PK\x03\x04\x14\x00\x00\x00".to_vec();
        data.extend_from_slice(b"word/document.xml");
        data.extend_from_slice(b"EncryptedPackage");
        data.resize(64, 0);
        let analysis = analyze("contract.docx", &data);
        assert_eq!(analysis.quality, DataQuality::Encrypted);
        assert_eq!(analysis.detected_mime.as_deref(), Some(DOCX_MIME));
        assert!(!analysis.is_processable);
    }

    #[test]
    fn test_zip_encryption_flag_bit() {
        // General-purpose flag bit 0 set in the local file header.
        let mut data = b"PK\x03\x04\x14\x00\x01\x00".to_vec();
        data.resize(64, 0);
        let analysis = analyze("archive.zip", &data);
        assert_eq!(analysis.quality, DataQuality::Encrypted);
    }

    #[test]
    fn test_extension_content_mismatch() {
        let data = b"%PDF-1.4\ncontent\n%%EOF";
        let analysis = analyze("photo.jpg", data);
        assert_eq!(analysis.quality, DataQuality::InvalidFormat);
        assert!(analysis.quality_details.contains("image/jpeg"));
        assert!(analysis.quality_details.contains("application/pdf"));
    }

    #[test]
    fn test_office_open_xml_probe() {
        let mut data = b"PK\x03\x04\x14\x00\x00\x00".to_vec();
        data.extend_from_slice(b"xl/workbook.xml");
        data.resize(64, 0);
        let analysis = analyze("numbers.xlsx", &data);
        assert_eq!(analysis.detected_mime.as_deref(), Some(XLSX_MIME));
        assert_eq!(analysis.category, FileCategory::Spreadsheet);
    }

    #[test]
    fn test_tiny_zip_is_corrupted() {
        let data = b"PK\x03\x04\x14\x00\x00\x00";
        let analysis = analyze("archive.zip", data);
        assert_eq!(analysis.quality, DataQuality::Corrupted);
        assert!(analysis.quality_details.contains("too small"));
    }

    #[test]
    fn test_suspicious_script_marker() {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.extend_from_slice(b"<script>alert(1)</script>");
        data.extend_from_slice(b"\n%%EOF");
        let analysis = analyze("invoice.pdf", &data);
        assert_eq!(analysis.quality, DataQuality::Suspicious);
        // Suspicious files remain processable.
        assert!(analysis.is_processable);
    }

    #[test]
    fn test_png_dimensions_extracted() {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(&12u32.to_be_bytes()); // IHDR length
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&640u32.to_be_bytes());
        data.extend_from_slice(&480u32.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data.extend_from_slice(b"\x00\x00\x00\x00IEND\xae\x42\x60\x82");
        let analysis = analyze("chart.png", &data);
        assert_eq!(analysis.category, FileCategory::Image);
        assert_eq!(analysis.quality, DataQuality::Valid);
        assert_eq!(analysis.metadata.get("width").unwrap(), "640");
        assert_eq!(analysis.metadata.get("height").unwrap(), "480");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let analysis = analyze("data.xyz123", b"arbitrary bytes with no signature");
        assert_eq!(analysis.category, FileCategory::Unknown);
        assert_eq!(analysis.quality, DataQuality::Valid);
    }

    #[test]
    fn test_hashes_match_known_vectors() {
        let analysis = analyze("hello.txt", b"hello");
        assert_eq!(analysis.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            analysis.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_missing_file_yields_placeholder() {
        let analysis = FileAnalyzer::new().analyze_path(Path::new("/nonexistent/evidence.bin"));
        assert_eq!(analysis.quality, DataQuality::Corrupted);
        assert!(analysis.quality_details.starts_with("Analysis failed:"));
        assert!(!analysis.is_processable);
    }

    #[test]
    fn test_processable_iff_valid_or_suspicious_and_nonempty() {
        for (name, data) in [
            ("a.pdf", b"%PDF-1.4 x %%EOF".to_vec()),
            ("b.pdf", b"%PDF-1.4 truncated".to_vec()),
            ("c.txt", Vec::new()),
            ("d.zip", b"PK\x03\x04\x14\x00\x01\x00aaaaaaaaaaaaaaaaaaaa".to_vec()),
        ] {
            let analysis = analyze(name, &data);
            let expected = matches!(
                analysis.quality,
                DataQuality::Valid | DataQuality::Suspicious
            ) && analysis.file_size > 0;
            assert_eq!(analysis.is_processable, expected, "{name}");
        }
    }

    proptest! {
        /// Identical bytes yield identical classification, byte for byte,
        /// excluding the analysis timestamp.
        #[test]
        fn prop_analysis_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let first = analyze("sample.bin", &data);
            let second = analyze("sample.bin", &data);
            prop_assert_eq!(first.quality, second.quality);
            prop_assert_eq!(first.category, second.category);
            prop_assert_eq!(&first.detected_mime, &second.detected_mime);
            prop_assert_eq!(&first.quality_details, &second.quality_details);
            prop_assert_eq!(&first.md5, &second.md5);
            prop_assert_eq!(&first.sha256, &second.sha256);
            prop_assert_eq!(&first.metadata, &second.metadata);
            prop_assert_eq!(first.is_processable, second.is_processable);
        }
    }
}
