// All LLM prompt templates for the interview flow.
// Placeholders are filled with `str::replace` before sending.

/// Question generation prompt. Replace: {difficulty}, {resume_text}, {asked_questions}
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Generate ONE {difficulty}-level technical interview question based on the resume below.
The question must be relevant to the candidate's skills and role.

Resume:
"""
{resume_text}
"""

Do NOT include any explanatory text, numbering or formatting. Return ONLY the question text.
Do NOT reuse any of these previously asked questions:
{asked_questions}"#;

/// Appended to the generation prompt after a duplicate. Replace: {question}
pub const ALREADY_ASKED_INSTRUCTION: &str = r#"

IMPORTANT: "{question}" has ALREADY been asked in this interview. Ask a different question on a different topic."#;

/// Answer evaluation prompt. Replace: {question}, {answer}, {signals}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the candidate's answer based on technical accuracy, depth and clarity.

Question: "{question}"
Candidate's answer: "{answer}"

Provide a concise one-sentence feedback and indicate the appropriate next difficulty level
as one of {signals}. Return a single JSON object ONLY, for example:
{"feedback": "One-sentence feedback. Next: HARDER", "nextDifficulty": "HARDER"}"#;

/// Final summary prompt. Replace: {transcript}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"You are analyzing a complete technical interview session.
Based on the transcript below, return ONLY a single JSON object with these keys:
- "strengths": string (2-3 items separated by newlines)
- "weaknesses": string (2-3 items separated by newlines)
- "suggestions": string (2-3 actionable items separated by newlines)

Transcript:
{transcript}"#;
