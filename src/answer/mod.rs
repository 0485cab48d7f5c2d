// Answer module
// Prompt assembly and the seam to the text generation service


use crate::Result;
use crate::database::SearchResult;

/// Produces a natural-language completion for a prompt
pub trait AnswerGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl<T: AnswerGenerator + ?Sized> AnswerGenerator for &T {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt)
    }
}

/// Join the text of each result, in result order, with a blank line
#[inline]
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[inline]
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Code context:\n{}\n\nQuestion: {}\nAnswer:",
        context, question
    )
}
