//! Image text extraction through a vision-capable chat model.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::TextExtractor;
use copyguard_core::traits::extractor::is_image_file;
use serde_json::json;

use crate::openai_compatible::OpenAiCompatibleProvider;

const TRANSCRIBE_INSTRUCTION: &str = "请仔细识别这张图片中的所有文字内容。要求：\
1. 准确识别中文、英文、数字、符号等所有文字；\
2. 按照图片中的原始布局顺序输出文字；\
3. 保持文字的完整性和准确性；\
4. 特别关注产品名称、功效描述、宣传语等关键信息。\
请直接输出识别到的文字内容，不要添加额外的解释。";

/// OCR backed by a vision model (default: Qwen2.5-VL on SiliconFlow).
pub struct VisionExtractor {
    provider: OpenAiCompatibleProvider,
    max_tokens: u32,
}

impl VisionExtractor {
    pub fn new(provider: OpenAiCompatibleProvider, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait]
impl TextExtractor for VisionExtractor {
    fn name(&self) -> &str {
        "vision"
    }

    /// Missing files and non-image paths are errors. Service failures are
    /// logged and reported as "no text found".
    async fn extract_text(&self, image: &Path) -> Result<String> {
        if !image.exists() {
            return Err(CopyGuardError::FileNotFound(image.display().to_string()));
        }
        if !self.supports(image) {
            return Err(CopyGuardError::UnsupportedFormat(image.display().to_string()));
        }

        let bytes = tokio::fs::read(image).await?;
        let data_uri = format!("data:{};base64,{}", mime_type(image), STANDARD.encode(&bytes));
        let messages = json!([{
            "role": "user",
            "content": [
                { "type": "text", "text": TRANSCRIBE_INSTRUCTION },
                { "type": "image_url", "image_url": { "url": data_uri } },
            ],
        }]);

        match self.provider.chat(messages, 0.1, self.max_tokens, false).await {
            Ok(raw) => {
                let text = collapse_whitespace(&raw);
                tracing::info!(
                    path = %image.display(),
                    chars = text.chars().count(),
                    "extracted text from image"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(path = %image.display(), "image text extraction failed: {e}");
                Ok(String::new())
            }
        }
    }

    fn supports(&self, path: &Path) -> bool {
        is_image_file(path)
    }
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tiff" => "image/tiff",
        _ => "image/jpeg",
    }
}

/// Trim and fold every whitespace run (newlines included) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai_compatible::ServiceSettings;
    use crate::provider_registry::get_provider_config;
    use std::time::Duration;

    fn extractor() -> VisionExtractor {
        let settings = ServiceSettings {
            provider: "llamacpp".into(),
            model: "vl".into(),
            api_key: String::new(),
            endpoint: "http://127.0.0.1:1/v1".into(),
            timeout: Duration::from_millis(200),
        };
        let registry = get_provider_config("llamacpp").unwrap();
        let provider = OpenAiCompatibleProvider::from_registry(registry, &settings, false).unwrap();
        VisionExtractor::new(provider, 2000)
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  【多肽蓬蓬瓶】\n\n修复  毛囊\t"), "【多肽蓬蓬瓶】 修复 毛囊");
        assert_eq!(collapse_whitespace("\n \n"), "");
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type(Path::new("a.jpg")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let err = extractor()
            .extract_text(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CopyGuardError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_empty_text() {
        let path = std::env::temp_dir().join(format!("copyguard-vision-{}.png", std::process::id()));
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let text = extractor().extract_text(&path).await.unwrap();
        assert!(text.is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
