//! Prompts and the response schema sent to the editing service.

use serde_json::{Value, json};

/// Name attached to the structured-output schema.
pub const RESPONSE_SCHEMA_NAME: &str = "copy_edit";

pub const SYSTEM_PROMPT: &str = r#"You are a senior copy editor who has worked for long-form magazines and newspapers. You sharpen prose without flattening the author's voice.

You check spelling, grammar, punctuation, and clarity. You prefer plain words and short, direct sentences. You never change the meaning of a passage, never add new claims, and never comment on the text: you only return the edited text in the requested format."#;

/// Build the task prompt for one chunk.
pub fn build_task_prompt(chunk_text: &str) -> String {
    format!(
        r#"Copy-edit the text below while keeping its content and meaning.

Rules:
1. Fix spelling mistakes and typos.
2. Fix grammar and punctuation.
3. Improve clarity with simple expressions and short, punchy sentences.
4. In the annotated version, wrap deleted text in ~~ and added text in ==, for example: "The ~~quick~~ ==fast== fox".
5. In the clean version, apply every change and include no markup.
6. Answer in the same language as the input text.
7. Keep paragraph breaks (blank lines) where they are.
8. Reply with a JSON object with exactly two string fields:
   {{"annotated": "text with changes marked", "clean": "final text with all changes applied"}}

Text:
{chunk_text}"#
    )
}

/// JSON schema of the two-field response.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "annotated": {
                "type": "string",
                "description": "The text with deletions wrapped in ~~ and insertions wrapped in =="
            },
            "clean": {
                "type": "string",
                "description": "The final text with all changes applied and no markup"
            }
        },
        "required": ["annotated", "clean"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_prompt_embeds_text_last() {
        let prompt = build_task_prompt("Teh cat sat.");
        assert!(prompt.ends_with("Text:\nTeh cat sat."));
        assert!(prompt.contains("wrap deleted text in ~~"));
        assert!(prompt.contains("added text in =="));
        assert!(prompt.contains(r#"{"annotated": "#));
    }

    #[test]
    fn test_schema_requires_both_fields() {
        let schema = response_schema();
        assert_eq!(schema["required"], json!(["annotated", "clean"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }
}
