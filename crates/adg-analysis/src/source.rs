// ABOUTME: Loads source files from disk with size, binary, and encoding guards.
// ABOUTME: Produces the hashed SourceFile records the analysis pipeline consumes.
use crate::classify;
use adg_core::{AnalysisError, ContentHash, Result, SourceEncoding, SourceFile};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Read and decode one source file.
///
/// The size limit is enforced from metadata before any bytes are read, so an
/// oversized file is rejected without buffering it. Non-UTF-8 files are
/// recovered as Latin-1 rather than dropped; only UTF-16 and binary content
/// are refused outright.
pub async fn load_source(path: &Path, max_file_size: u64) -> Result<SourceFile> {
    let size_bytes = tokio::fs::metadata(path).await?.len();
    if size_bytes > max_file_size {
        return Err(AnalysisError::FileTooLarge {
            size: size_bytes,
            limit: max_file_size,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    decode_bytes(path, bytes)
}

fn decode_bytes(path: &Path, bytes: Vec<u8>) -> Result<SourceFile> {
    if bytes.starts_with(&UTF16_LE_BOM) || bytes.starts_with(&UTF16_BE_BOM) {
        return Err(AnalysisError::Encoding(format!(
            "UTF-16 encoded file is not supported: {}",
            path.display()
        )));
    }

    if classify::is_binary(&bytes) {
        return Err(AnalysisError::UnsupportedLanguage(format!(
            "binary file: {}",
            path.display()
        )));
    }

    let size_bytes = bytes.len() as u64;
    let hash = ContentHash::of_bytes(&bytes);
    let (content, encoding) = decode_text(&bytes, path);
    let language = classify::classify(path, &content);

    Ok(SourceFile {
        path: path.to_path_buf(),
        language,
        content,
        encoding,
        size_bytes,
        hash,
    })
}

fn decode_text(bytes: &[u8], path: &Path) -> (String, SourceEncoding) {
    if let Some(stripped) = bytes.strip_prefix(&UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(stripped) {
            return (text.to_owned(), SourceEncoding::Utf8Bom);
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_owned(), SourceEncoding::Utf8);
    }

    // Latin-1 maps every byte to the code point of the same value, so this
    // recovery step cannot fail. Mirrors lenient text editors more than
    // strict compilers, which is the right bias for analysis input.
    debug!(path = %path.display(), "recovering non-UTF-8 file as Latin-1");
    let text: String = bytes.iter().map(|&b| b as char).collect();
    (text, SourceEncoding::Latin1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adg_core::Language;
    use std::fs;

    async fn load(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> Result<SourceFile> {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        load_source(&path, 1024 * 1024).await
    }

    #[tokio::test]
    async fn plain_utf8_file_loads_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let source = load(&dir, "main.rs", b"fn main() {}\n").await.unwrap();
        assert_eq!(source.language, Language::Rust);
        assert_eq!(source.encoding, SourceEncoding::Utf8);
        assert_eq!(source.content, "fn main() {}\n");
        assert_eq!(source.size_bytes, 13);
        assert_eq!(source.hash, ContentHash::of_bytes(b"fn main() {}\n"));
    }

    #[tokio::test]
    async fn utf8_bom_is_stripped_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"import os\n");
        let source = load(&dir, "app.py", &bytes).await.unwrap();
        assert_eq!(source.encoding, SourceEncoding::Utf8Bom);
        assert_eq!(source.content, "import os\n");
        // The hash still covers the raw bytes, BOM included.
        assert_eq!(source.hash, ContentHash::of_bytes(&bytes));
    }

    #[tokio::test]
    async fn invalid_utf8_recovers_as_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let source = load(&dir, "legacy.py", b"# caf\xe9\nx = 1\n").await.unwrap();
        assert_eq!(source.encoding, SourceEncoding::Latin1);
        assert!(source.content.contains("caf\u{e9}"));
    }

    #[tokio::test]
    async fn utf16_bom_is_rejected_as_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir, "wide.py", b"\xff\xfei\x00m\x00").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Encoding(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn binary_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir, "blob.py", b"\x7fELF\x00\x01\x02").await.unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedLanguage(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.rs");
        fs::write(&path, vec![b'a'; 64]).unwrap();
        let err = load_source(&path, 16).await.unwrap_err();
        match err {
            AnalysisError::FileTooLarge { size, limit } => {
                assert_eq!(size, 64);
                assert_eq!(limit, 16);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source(&dir.path().join("gone.rs"), 1024).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
