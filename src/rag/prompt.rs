//! Recommendation prompt.

use crate::rag::output::format_instructions;
use crate::types::ContextDocument;

/// Separator between retrieved passages in the `{context}` slot.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const RECOMMEND_TEMPLATE: &str = r#"You are a "book review AI chatbot" that specializes in recommending books for philosophical awareness.
Some book information that you can reference is provided below.

Context Information:
{context}

User Question:
{question}

The user enters a keyword, a proposition, or a keyword followed by a proposition.
Using only the data provided, analyze it and recommend the top 3 books that match the input.
Answer in the language of the user question: if the user writes in Japanese, answer in Japanese; if the user writes in English, answer in English.

For each book give:
Title: [Book Title]
Author: [Author Name]
Recommendation Reason: [Detailed explanation of the book's relevance]

Enter the title and author exactly as they appear in the data.
For example, if the title of the book you are recommending is "「昭和」を送る", do not change it to "昭和を送る"; write "「昭和」を送る".

{format_instructions}"#;

/// Join passage texts in retrieval order.
pub fn render_context(context: &[ContextDocument]) -> String {
    context
        .iter()
        .map(|doc| doc.page_content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Fill the template with the retrieved passages and the sanitized question.
pub fn build_prompt(context: &[ContextDocument], question: &str) -> String {
    // Slots are filled in one pass so braces inside the passages or the
    // question are never treated as placeholders.
    let mut prompt = String::with_capacity(RECOMMEND_TEMPLATE.len() + question.len());
    let mut rest = RECOMMEND_TEMPLATE;

    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let after = &rest[open..];
        let (value, consumed) = if after.starts_with("{context}") {
            (render_context(context), "{context}".len())
        } else if after.starts_with("{question}") {
            (question.to_string(), "{question}".len())
        } else if after.starts_with("{format_instructions}") {
            (format_instructions(), "{format_instructions}".len())
        } else {
            ("{".to_string(), 1)
        };
        prompt.push_str(&value);
        rest = &after[consumed..];
    }
    prompt.push_str(rest);

    prompt
}
