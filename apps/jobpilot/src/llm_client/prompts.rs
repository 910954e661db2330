// Shared prompt fragments.
// Each module that calls the LLM defines its own prompts.rs alongside it;
// this file only holds the cross-cutting pieces.

/// Instruction appended to every prompt that consumes résumé text.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base every statement on the résumé and job description provided. \
    Do NOT invent employers, titles, dates, degrees or metrics that are not present in the résumé.";
