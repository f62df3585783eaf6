//! Rule document loading.
//!
//! Plain text and Markdown are read as-is, `.docx` through its
//! `word/document.xml` part, and `.pdf` through its text layer. Images are
//! not documents: [`load_many`] sends them to a [`TextExtractor`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::extractor::is_image_file;
use copyguard_core::traits::{DocumentLoader, TextExtractor};
use copyguard_core::types::TextBlock;
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

/// Extensions read as UTF-8 text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Word extensions. `.doc` is accepted when it is really an OOXML package.
pub const WORD_EXTENSIONS: &[&str] = &["docx", "doc"];

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CopyGuardError::FileNotFound(path.display().to_string()))
    }
}

fn unsupported(path: &Path, supported: &[&str]) -> CopyGuardError {
    CopyGuardError::UnsupportedFormat(format!(
        "{} (supported: {})",
        path.display(),
        supported.join(", ")
    ))
}

/// One block per document; nothing for a document without text.
fn single_block(path: &Path, text: String) -> Vec<TextBlock> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![TextBlock::new(path.display().to_string(), text)]
    }
}

/// Loads `.txt` / `.md` rule documents as a single text block.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<TextBlock>> {
        ensure_exists(path)?;
        if !TEXT_EXTENSIONS.contains(&extension(path).as_str()) {
            return Err(unsupported(path, TEXT_EXTENSIONS));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(single_block(path, text))
    }
}

/// Loads Word documents. Paragraphs become lines; tabs and breaks are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> Result<Vec<TextBlock>> {
        ensure_exists(path)?;
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            CopyGuardError::Document(format!("{} is not a Word package: {e}", path.display()))
        })?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| {
                CopyGuardError::Document(format!("{} has no document body: {e}", path.display()))
            })?
            .read_to_string(&mut xml)?;
        Ok(single_block(path, docx_text(&xml)?))
    }
}

/// Text runs of a WordprocessingML body.
fn docx_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_run_text = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_run_text => {
                let text = e
                    .unescape()
                    .map_err(|e| CopyGuardError::Document(format!("bad document text: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CopyGuardError::Document(format!(
                    "malformed document.xml at {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Loads the text layer of a PDF. Scanned PDFs without one yield nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<TextBlock>> {
        ensure_exists(path)?;
        let text = pdf_extract::extract_text(path).map_err(|e| {
            CopyGuardError::Document(format!("cannot read PDF {}: {e}", path.display()))
        })?;
        Ok(single_block(path, text))
    }
}

/// Picks a loader by file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleDocumentLoader;

impl DocumentLoader for RuleDocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<TextBlock>> {
        ensure_exists(path)?;
        let ext = extension(path);
        let ext = ext.as_str();
        if TEXT_EXTENSIONS.contains(&ext) {
            PlainTextLoader.load(path)
        } else if WORD_EXTENSIONS.contains(&ext) {
            DocxLoader.load(path)
        } else if PDF_EXTENSIONS.contains(&ext) {
            PdfLoader.load(path)
        } else {
            let supported: Vec<&str> = TEXT_EXTENSIONS
                .iter()
                .chain(WORD_EXTENSIONS)
                .chain(PDF_EXTENSIONS)
                .copied()
                .collect();
            Err(unsupported(path, &supported))
        }
    }
}

/// Load several documents, skipping the ones that fail.
///
/// Image paths go through `extractor`; without one they are skipped.
pub async fn load_many(
    loader: &dyn DocumentLoader,
    extractor: Option<&dyn TextExtractor>,
    paths: &[PathBuf],
) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for path in paths {
        let loaded = if is_image_file(path) {
            load_image(extractor, path).await
        } else {
            loader.load(path)
        };
        match loaded {
            Ok(mut loaded) => blocks.append(&mut loaded),
            Err(e) => tracing::warn!(path = %path.display(), "skipping document: {e}"),
        }
    }
    blocks
}

async fn load_image(extractor: Option<&dyn TextExtractor>, path: &Path) -> Result<Vec<TextBlock>> {
    ensure_exists(path)?;
    let extractor = extractor.ok_or_else(|| {
        CopyGuardError::Config("image rule documents require [vision] to be enabled".into())
    })?;
    let text = extractor.extract_text(path).await?;
    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "no text recognized in image");
    }
    Ok(single_block(path, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("copyguard-loader-{}.{ext}", uuid::Uuid::new_v4()))
    }

    fn temp_file(ext: &str, content: &str) -> PathBuf {
        let path = temp_path(ext);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn temp_docx(document_xml: &str) -> PathBuf {
        let path = temp_path("docx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    struct CannedOcr(&'static str);

    #[async_trait]
    impl TextExtractor for CannedOcr {
        fn name(&self) -> &str {
            "canned"
        }

        async fn extract_text(&self, _image: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_load_markdown() {
        let path = temp_file("md", "# 规则\n禁止使用“根治”。");
        let blocks = PlainTextLoader.load(&path).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.contains("根治"));
        assert_eq!(blocks[0].source_id, path.display().to_string());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_and_unsupported() {
        let missing = RuleDocumentLoader.load(Path::new("/no/such/rules.docx"));
        assert!(matches!(missing, Err(CopyGuardError::FileNotFound(_))));

        let pdf = temp_file("pdf", "%PDF-1.4");
        let unsupported = PlainTextLoader.load(&pdf);
        assert!(matches!(unsupported, Err(CopyGuardError::UnsupportedFormat(_))));
        let _ = std::fs::remove_file(&pdf);

        let sheet = temp_file("xlsx", "x");
        let unsupported = RuleDocumentLoader.load(&sheet);
        assert!(matches!(unsupported, Err(CopyGuardError::UnsupportedFormat(_))));
        let _ = std::fs::remove_file(&sheet);
    }

    #[test]
    fn test_load_docx_paragraphs() {
        let path = temp_docx(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>指引一：</w:t></w:r><w:r><w:t xml:space="preserve">禁止使用 “根治”</w:t></w:r></w:p>
<w:p><w:r><w:t>A</w:t><w:tab/><w:t>&amp; B</w:t></w:r></w:p>
</w:body>
</w:document>"#,
        );
        let blocks = RuleDocumentLoader.load(&path).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "指引一：禁止使用 “根治”\nA\t& B\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_docx_without_body_or_not_zip() {
        let not_zip = temp_file("docx", "plain text pretending to be Word");
        assert!(matches!(
            DocxLoader.load(&not_zip),
            Err(CopyGuardError::Document(_))
        ));
        let _ = std::fs::remove_file(&not_zip);

        let path = temp_path("docx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("other.xml", options).unwrap();
        zip.write_all(b"<x/>").unwrap();
        zip.finish().unwrap();
        assert!(matches!(DocxLoader.load(&path), Err(CopyGuardError::Document(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_pdf_is_document_error() {
        let path = temp_file("pdf", "this is not a pdf");
        assert!(matches!(PdfLoader.load(&path), Err(CopyGuardError::Document(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_load_many_skips_failures() {
        let good = temp_file("txt", "不得宣称治疗脱发");
        let blocks = load_many(
            &RuleDocumentLoader,
            None,
            &[PathBuf::from("/no/such/file.txt"), good.clone()],
        )
        .await;
        assert_eq!(blocks.len(), 1);
        let _ = std::fs::remove_file(&good);
    }

    #[tokio::test]
    async fn test_load_many_routes_images_to_extractor() {
        let image = temp_file("png", "fake png bytes");
        let rules = temp_file("md", "禁止使用“神效”");
        let paths = vec![rules.clone(), image.clone()];

        let without = load_many(&RuleDocumentLoader, None, &paths).await;
        assert_eq!(without.len(), 1);

        let ocr = CannedOcr("图片中的规则：禁止宣称修复毛囊");
        let with = load_many(&RuleDocumentLoader, Some(&ocr as &dyn TextExtractor), &paths).await;
        assert_eq!(with.len(), 2);
        assert_eq!(with[1].source_id, image.display().to_string());
        assert!(with[1].text.contains("毛囊"));

        let blank = CannedOcr("  ");
        assert_eq!(load_many(&RuleDocumentLoader, Some(&blank as &dyn TextExtractor), &paths).await.len(), 1);

        let _ = std::fs::remove_file(&image);
        let _ = std::fs::remove_file(&rules);
    }
}
