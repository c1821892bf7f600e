//! Prompt assembly. Plain string concatenation; no templating engine.

use crate::PromptTemplate;

pub fn query_extraction(excerpt: &str) -> String {
    format!(
        "Read the following roleplay chat excerpt and identify the source work, \
characters, places or setting details it refers to. Reply with a single web search \
query (keywords only, no explanation, no quotes) that would find factual reference \
material about them.\n\nChat excerpt:\n{excerpt}"
    )
}

fn grounding_preamble(evidence: &str) -> String {
    format!(
        "You must base your answer on real, existing source material. Use the search \
results below as evidence; do not invent facts that are not supported by them or by \
the source work itself.\n\n<search_results>\n{evidence}\n</search_results>"
    )
}

fn output_instruction(template: &PromptTemplate) -> &'static str {
    if template.wants_json() {
        "Output the result as structured JSON only."
    } else {
        "Output the result as a concise list, one point per line."
    }
}

/// Template body, grounding preamble, chat excerpt, output instruction.
pub fn analysis(template: &PromptTemplate, evidence: &str, excerpt: &str) -> String {
    format!(
        "{}\n\n{}\n\nChat excerpt:\n{}\n\n{}",
        template.prompt,
        grounding_preamble(evidence),
        excerpt,
        output_instruction(template)
    )
}
