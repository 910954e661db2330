// All LLM prompt constants for the analysis pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for compatibility analysis: enforces JSON-only output.
pub const COMPATIBILITY_SYSTEM: &str = "You are an expert HR analyst comparing a candidate's \
    résumé against a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Compatibility prompt template.
/// Replace: {grounding_instruction}, {resume_text}, {jd_text}
pub const COMPATIBILITY_PROMPT_TEMPLATE: &str = r#"Analyze how well the résumé below matches the job description.

{grounding_instruction}

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 72,
  "strengths": ["Five years of production Python matches the core requirement"],
  "weaknesses": ["No evidence of NLP work, which the role lists as preferred"],
  "keyword_analysis": [
    {"keyword": "Python", "present": true},
    {"keyword": "NLP", "present": false}
  ],
  "summary": "Two to three sentences on overall fit."
}

Rules:
- "score" is an integer from 0 to 100.
- "strengths" and "weaknesses" are ordered most important first.
- "keyword_analysis" lists the 3-5 most important keywords from the job description;
  "present" is true when the résumé states or strongly implies the keyword.

RÉSUMÉ:
---
{resume_text}
---

JOB DESCRIPTION:
---
{jd_text}
---"#;

/// System prompt for cover letter drafting: plain prose output.
pub const COVER_LETTER_SYSTEM: &str = "You are a professional cover letter writer. \
    Respond with the letter text only: no preamble, no commentary, no markdown headings.";

/// Cover letter prompt template.
/// Replace: {candidate_name}, {job_title}, {company_name}, {grounding_instruction},
///          {resume_text}, {jd_text}, {insights}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Draft a tailored cover letter written by {candidate_name} for the position of '{job_title}' at '{company_name}'.

Tone: professional, enthusiastic and confident.
Structure: an introduction, two or three body paragraphs connecting the résumé to the role's requirements, and a closing paragraph with a call to action.
Length: three to four paragraphs.

{grounding_instruction}

--- Candidate's Résumé ---
{resume_text}

--- Job Description ---
{jd_text}
{insights}
--- Draft the Cover Letter Below ---"#;

pub const COVER_LETTER_INSIGHTS_HEADER: &str =
    "--- Compatibility Insights (use these to strengthen the letter) ---";

/// System prompt for résumé tuning: bulleted prose output.
pub const RESUME_TUNER_SYSTEM: &str = "You are an expert résumé consultant and career coach. \
    Respond with a short overall recommendation followed by bullet-pointed suggestions.";

/// Résumé tuning prompt template.
/// Replace: {grounding_instruction}, {resume_text}, {jd_text}, {analysis_section}
pub const RESUME_TUNER_PROMPT_TEMPLATE: &str = r#"Suggest specific, actionable improvements to the résumé below so it better matches the job description.

Focus on:
- Rephrasing existing bullet points, or adding new ones, to highlight relevant skills and achievements.
- Working the job description's important keywords into the résumé naturally.
- Addressing the gaps identified below by presenting existing experience more effectively, or naming skills worth developing.
- Making the candidate's suitability for this specific role obvious to a reader.

{grounding_instruction}

--- Candidate's Current Résumé ---
{resume_text}

--- Target Job Description ---
{jd_text}

--- Compatibility Analysis ---
{analysis_section}

--- Résumé Improvement Suggestions (bullet points) ---"#;

/// Used in place of the analysis section when Stage A output is unavailable.
pub const ANALYSIS_UNAVAILABLE: &str = "No compatibility analysis is available for this résumé. \
    Work from the résumé and job description text alone.";
