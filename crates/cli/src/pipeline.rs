//! Request handling: extract slides with the LLM, then write the deck.

use chrono::{DateTime, Utc};
use log::{debug, info};
use slidegen_core::{AppConfig, Error, PresentationFormat, Result, TemplateSource};
use slidegen_llm::{ChatClient, SlideExtractor};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Distinguishes files generated within the same second.
static OUTPUT_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// One generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Text to split into slides.
    pub text: String,
    /// Optional style guidance for the model.
    pub guidance: Option<String>,
    /// Credential for the chat-completion service.
    pub api_key: Option<String>,
    /// Template whose masters and layouts are reused.
    pub template: TemplateSource,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = TemplateSource::File(path.into());
        self
    }
}

/// Text in, presentation file out.
pub struct Pipeline<C> {
    config: AppConfig,
    extractor: SlideExtractor<C>,
}

impl<C: ChatClient> Pipeline<C> {
    pub fn new(config: AppConfig, client: C) -> Self {
        Self {
            config,
            extractor: SlideExtractor::new(client),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one request and return the path of the generated file.
    ///
    /// Nothing is written unless every step succeeds.
    pub fn run(&self, request: &GenerationRequest) -> Result<PathBuf> {
        self.validate(request)?;

        let slides = self.extractor.extract_slides(
            &request.text,
            request.guidance.as_deref(),
            request.api_key.as_deref(),
        )?;
        debug!("{} slide(s) to render", slides.len());

        std::fs::create_dir_all(&self.config.output_dir)?;
        let output = self.config.output_dir.join(output_file_name(
            &request.template,
            Utc::now(),
            OUTPUT_COUNTER.fetch_add(1, Ordering::Relaxed),
        ));

        slidegen_pptx::generate(&request.template, &slides, &output)?;
        info!("generated {}", output.display());
        Ok(output)
    }

    fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(Error::InvalidInput("no text provided".to_string()));
        }
        if let Some(path) = request.template.path() {
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(PresentationFormat::from_extension);
            if format.is_none() || !self.config.is_allowed_template(path) {
                return Err(Error::UnsupportedFormat(format!(
                    "{} (expected one of: {})",
                    path.display(),
                    self.config.allowed_extensions.join(", ")
                )));
            }
            if !has_package_signature(path) {
                return Err(Error::UnsupportedFormat(format!(
                    "{} is not a presentation package",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// False only when the file can be opened and does not start like a ZIP
/// archive. Unreadable files are reported later by the loader.
fn has_package_signature(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return true;
    };
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).is_ok() && PresentationFormat::is_zip_magic(&magic)
}

/// `generated_<stem>_<timestamp>_<n>.pptx`, with `presentation` as the stem
/// when there is no template.
fn output_file_name(template: &TemplateSource, now: DateTime<Utc>, counter: usize) -> String {
    let stem = template
        .path()
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "presentation".to_string());
    format!(
        "generated_{}_{}_{}.pptx",
        stem,
        now.format("%Y%m%d_%H%M%S"),
        counter
    )
}

/// Keep a file name component to ASCII letters, digits, `-` and `_`.
fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use slidegen_core::types::FALLBACK_TITLE;
    use slidegen_pptx::PptxParser;
    use std::cell::Cell;

    struct MockClient {
        reply: std::result::Result<String, String>,
        calls: Cell<usize>,
    }

    impl MockClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Cell::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: Cell::new(0),
            }
        }
    }

    impl ChatClient for MockClient {
        fn complete(&self, _api_key: &str, _prompt: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.reply.clone().map_err(Error::Llm)
        }
    }

    const REPLY: &str = r#"```json
[{"title": "Intro", "bullets": ["a", "b"], "notes": "say hi"},
 {"title": "End", "bullets": ["c"]}]
```"#;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("generated"),
            ..AppConfig::default()
        }
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_run_without_template() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let request = GenerationRequest::new("Some long text").with_api_key("sk-test");
        let output = pipeline.run(&request).unwrap();

        assert_eq!(client.calls.get(), 1);
        assert!(output.starts_with(dir.path().join("generated")));
        let name = output.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("generated_presentation_"));
        assert!(name.ends_with(".pptx"));

        let slides = PptxParser::new().parse(File::open(&output).unwrap()).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Intro");
        assert_eq!(slides[0].bullets, vec!["a", "b"]);
        assert_eq!(slides[0].notes.as_deref(), Some("say hi"));
        assert_eq!(slides[1].notes, None);
    }

    #[test]
    fn test_run_with_template() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let template = uploads.join("Quarterly Review.potx");
        slidegen_pptx::generate(
            &TemplateSource::None,
            &[slidegen_core::SlideRecord::new("Old slide")],
            &template,
        )
        .unwrap();

        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);
        let request = GenerationRequest::new("text")
            .with_api_key("sk-test")
            .with_template(&template);
        let output = pipeline.run(&request).unwrap();

        let name = output.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("generated_Quarterly_Review_"));
        let slides = PptxParser::new().parse(File::open(&output).unwrap()).unwrap();
        let titles: Vec<_> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "End"]);
    }

    #[test]
    fn test_unparseable_reply_gives_one_slide() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying("Sorry, I can't do that.");
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let output = pipeline
            .run(&GenerationRequest::new("Body text").with_api_key("k"))
            .unwrap();
        let slides = PptxParser::new().parse(File::open(&output).unwrap()).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, FALLBACK_TITLE);
        assert_eq!(slides[0].bullets, vec!["Body text..."]);
    }

    #[test]
    fn test_blank_text_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let err = pipeline
            .run(&GenerationRequest::new("  \n").with_api_key("k"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn test_template_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let request = GenerationRequest::new("text")
            .with_api_key("k")
            .with_template(dir.path().join("notes.docx"));
        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn test_template_content_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.pptx");
        std::fs::write(&fake, "just some text").unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let request = GenerationRequest::new("text")
            .with_api_key("k")
            .with_template(&fake);
        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref m) if m.contains("fake.pptx")));
        assert_eq!(client.calls.get(), 0);
        assert_eq!(files_in(&dir.path().join("generated")), 0);
    }

    #[test]
    fn test_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let err = pipeline.run(&GenerationRequest::new("text")).unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
        assert_eq!(client.calls.get(), 0);
        assert_eq!(files_in(&dir.path().join("generated")), 0);
    }

    #[test]
    fn test_llm_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::failing("HTTP 401: invalid key");
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let err = pipeline
            .run(&GenerationRequest::new("text").with_api_key("bad"))
            .unwrap_err();
        assert!(matches!(err, Error::Llm(ref m) if m.contains("401")));
        assert_eq!(client.calls.get(), 1);
        assert_eq!(files_in(&dir.path().join("generated")), 0);
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let request = GenerationRequest::new("text")
            .with_api_key("k")
            .with_template(dir.path().join("gone.pptx"));
        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, Error::Document(_)));
        assert_eq!(files_in(&dir.path().join("generated")), 0);
    }

    #[test]
    fn test_output_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockClient::replying(REPLY);
        let pipeline = Pipeline::new(config_in(dir.path()), &client);

        let request = GenerationRequest::new("text").with_api_key("k");
        let first = pipeline.run(&request).unwrap();
        let second = pipeline.run(&request).unwrap();
        assert_ne!(first, second);
        assert_eq!(files_in(&dir.path().join("generated")), 2);
    }

    #[test]
    fn test_output_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            output_file_name(&TemplateSource::None, now, 4),
            "generated_presentation_20240305_140709_4.pptx"
        );
        assert_eq!(
            output_file_name(&TemplateSource::File("up/My Deck!.pptx".into()), now, 0),
            "generated_My_Deck_20240305_140709_0.pptx"
        );
        assert_eq!(
            output_file_name(&TemplateSource::File("up/???.pptx".into()), now, 1),
            "generated_presentation_20240305_140709_1.pptx"
        );
    }
}
