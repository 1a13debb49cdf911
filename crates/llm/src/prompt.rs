//! Prompt construction for slide extraction.

/// Build the single user prompt sent to the model.
///
/// Guidance, when present, is appended to the instruction line.
pub fn build_prompt(text: &str, guidance: Option<&str>) -> String {
    let guidance = guidance.map(str::trim).filter(|g| !g.is_empty());

    let mut prompt = String::from(
        "Analyze the following text and break it down into sections suitable for PowerPoint slides.",
    );
    if let Some(guidance) = guidance {
        prompt.push(' ');
        prompt.push_str(guidance);
    }
    prompt.push_str(
        "\nReturn a JSON array of slides, each with the following structure:\n\
         {\"title\": \"Slide Title\", \"bullets\": [\"Point 1\", \"Point 2\"], \"notes\": \"Speaker notes\"}\n\
         Respond with the JSON array only.\n\nText:\n",
    );
    prompt.push_str(text);
    prompt
}
