//! Prompt templates sent to the generation backend.
//!
//! Each template truncates its input when constructed, so `render()` never embeds more than the
//! configured number of characters of document text.

/// Return at most `limit` characters of `text`, cut on a character boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}

/// Summarization prompt requesting `{summary, key_points}`.
#[derive(Debug, Clone)]
pub struct SummaryPrompt<'a> {
    excerpt: &'a str,
}

impl<'a> SummaryPrompt<'a> {
    /// Build the prompt from the first `char_limit` characters of `text`.
    pub fn new(text: &'a str, char_limit: usize) -> Self {
        Self {
            excerpt: truncate_chars(text, char_limit),
        }
    }

    /// Document text that will be embedded.
    pub fn excerpt(&self) -> &str {
        self.excerpt
    }

    /// Render the prompt text.
    pub fn render(&self) -> String {
        format!(
            "You are an expert in government policies and regulations.\n\
             Analyze the following text from a government document and provide:\n\
             1. A concise professional summary (approx 200 words).\n\
             2. A list of 5-8 key strategic points or rules defined in the text.\n\n\
             Format the output as a JSON object with keys: \"summary\" (string) and \
             \"key_points\" (list of strings). Respond with JSON only.\n\n\
             TEXT:\n{}\n",
            self.excerpt
        )
    }
}

/// Question-generation prompt requesting a JSON array of multiple-choice items.
#[derive(Debug, Clone)]
pub struct QuestionPrompt<'a> {
    excerpt: &'a str,
    organization: &'a str,
    count: usize,
}

impl<'a> QuestionPrompt<'a> {
    /// Build the prompt from the first `char_limit` characters of `text`.
    pub fn new(text: &'a str, organization: &'a str, count: usize, char_limit: usize) -> Self {
        Self {
            excerpt: truncate_chars(text, char_limit),
            organization,
            count,
        }
    }

    /// Document text that will be embedded.
    pub fn excerpt(&self) -> &str {
        self.excerpt
    }

    /// Render the prompt text.
    pub fn render(&self) -> String {
        format!(
            "Generate {count} multiple-choice questions (MCQs) for government exam preparation \
             based on the following text.\n\
             Organization context: {organization}\n\n\
             Each question must have:\n\
             - question_text\n\
             - options (list of 4 strings)\n\
             - correct_index (0-3)\n\
             - explanation (why it's correct)\n\
             - difficulty (easy, medium, hard)\n\n\
             Format as a JSON array of objects. Respond with JSON only.\n\n\
             TEXT:\n{excerpt}\n",
            count = self.count,
            organization = self.organization,
            excerpt = self.excerpt,
        )
    }
}
