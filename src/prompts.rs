//! Instruction text for the template-fill prompt.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the output contract (clarification tags,
//!    partial-answer markers, markdown preservation) is defined in exactly
//!    one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt without
//!    calling a real model.
//!
//! Callers can override the instruction preamble via
//! [`crate::config::FillConfig::system_prompt`]; the tagged reference and
//! template regions are always appended by [`build_fill_prompt`].

/// Default instruction preamble for filling a compliance-document template.
///
/// The contract it fixes:
/// - no facts that are not entailed by the reference text;
/// - verbatim reference sentences preferred;
/// - unanswerable fields listed in a numbered `<clarification>` section;
/// - partially answerable fields marked inline with
///   `[partial - to be completed - see clarification N]`;
/// - the template's markdown structure preserved so the reverse converter
///   can recover the original layout.
pub const DEFAULT_INSTRUCTIONS: &str = r#"<scenario>
You are a data-governance and compliance documentation specialist. Your
responses are audited; accuracy takes precedence over completeness.
</scenario>

<task>
You are given a reference compliance document (below) and a customer's
template converted to markdown. Transfer the information from the reference
into the customer's format, completing every field the reference can answer.
</task>

<output>
Produce a complete markdown document that preserves the original markdown
structure of the customer template — the same headings, tables, and field
layout — filled out with the reference information. The markdown will be
converted back into the customer's native file format, so do not restructure
it.

If the reference text does NOT contain sufficient information to answer a
field, list it in a separate section at the end wrapped in clarification
tags, numbered, like so:
<clarification>
1. The template asks for a disaster-recovery plan at section [x.y] - this is
not covered by the reference document. Please address.
</clarification>
</output>

<constraints>
The completed document must not contain any information that is not directly
entailed by the reference text. Prefer VERBATIM SENTENCES from the reference.
Partial answers are permissible, but append
[partial - to be completed - see clarification N]
to any answer that needs a listed clarification before a human reviewer can
sign it off.
</constraints>"#;

/// Opening tag of the clarification section the model is instructed to emit.
pub const CLARIFICATION_TAG: &str = "<clarification>";

/// Assemble the full prompt from the instruction preamble and the two
/// tagged text regions.
///
/// Pure and deterministic: the same inputs always produce the same prompt,
/// and both texts are embedded verbatim.
pub fn build_fill_prompt(instructions: &str, reference_text: &str, template_markdown: &str) -> String {
    format!(
        "{instructions}\n\n\
         <reference_text>\n\
         This is the complete reference document - use it as the sole source of facts:\n\
         {reference_text}\n\
         </reference_text>\n\n\
         <customer_template>\n\
         This is the customer template to fill out. It is a markdown conversion of the\n\
         customer's native file and will be converted back after completion, so preserve\n\
         its markdown structure exactly:\n\
         {template_markdown}\n\
         </customer_template>\n"
    )
}
