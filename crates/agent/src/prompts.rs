const EXTRACTION_TEMPLATE: &str = r#"You turn a tradesperson's spoken job notes into a quote draft.

Return only a JSON object with this shape:
{
  "clientName": string,
  "jobAddress": string,
  "scopeSummary": string,
  "items": [{ "description": string, "qty": number, "price": number }]
}

Rules:
- Use only facts stated in the notes. Never invent quantities or prices.
- If a quantity is not stated, use 1. If a price is not stated, use 0.
- Leave clientName or jobAddress as "" when they are not mentioned.
- scopeSummary is two or three plain sentences describing the work.
- No commentary, no Markdown.

Notes:
{transcript}"#;

const REWRITE_TEMPLATE: &str = r#"Rewrite this scope of work for a customer quote.
Keep every fact, quantity, and price exactly as given. Use clear, professional
plain English in two to four sentences. Return only the rewritten text.

Text:
{text}"#;

pub fn extraction_prompt(transcript: &str) -> String {
    EXTRACTION_TEMPLATE.replace("{transcript}", transcript.trim())
}

pub fn rewrite_prompt(text: &str) -> String {
    REWRITE_TEMPLATE.replace("{text}", text.trim())
}

#[cfg(test)]
mod tests {
    use super::{extraction_prompt, rewrite_prompt};

    #[test]
    fn extraction_prompt_forbids_invented_figures() {
        let prompt = extraction_prompt("  paint two walls at fifty each ");
        assert!(prompt.contains("Never invent quantities or prices"));
        assert!(prompt.ends_with("paint two walls at fifty each"));
    }

    #[test]
    fn rewrite_prompt_embeds_text() {
        assert!(rewrite_prompt("fix gutter").ends_with("fix gutter"));
    }
}
