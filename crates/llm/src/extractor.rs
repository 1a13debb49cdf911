//! Slide content extraction: one LLM call, then lenient parsing.

use crate::client::ChatClient;
use crate::parse::parse_response;
use crate::prompt::build_prompt;
use log::debug;
use slidegen_core::{Error, Extraction, Result, SlideRecord};

/// Splits free-form text into slide records using a chat-completion model.
pub struct SlideExtractor<C> {
    client: C,
}

impl<C: ChatClient> SlideExtractor<C> {
    /// Create an extractor backed by the given client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Ask the model to split `text` into slides.
    ///
    /// Fails with [`Error::Credential`] before any request when `api_key` is
    /// missing or blank. Transport and API failures surface as
    /// [`Error::Llm`]; an unparseable reply is not an error and yields
    /// [`Extraction::Fallback`].
    pub fn extract(
        &self,
        text: &str,
        guidance: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Extraction> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Credential("missing or blank".to_string()))?;

        let prompt = build_prompt(text, guidance);
        let reply = self.client.complete(api_key, &prompt)?;
        debug!("LLM reply: {} chars", reply.len());

        let extraction = parse_response(&reply, text);
        debug!(
            "extracted {} slide(s){}",
            extraction.slides().len(),
            if extraction.is_fallback() { " (fallback)" } else { "" }
        );
        Ok(extraction)
    }

    /// Like [`extract`](Self::extract), flattened to the ordered records.
    pub fn extract_slides(
        &self,
        text: &str,
        guidance: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<SlideRecord>> {
        self.extract(text, guidance, api_key).map(Extraction::into_slides)
    }
}
