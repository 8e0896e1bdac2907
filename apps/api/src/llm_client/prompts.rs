// Shared prompt fragments. Each interview component keeps its own templates
// in interview/prompts.rs; this file holds the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for every interviewer-persona call.
pub const INTERVIEWER_SYSTEM: &str = "You are an expert technical interviewer. \
    You ask precise, resume-grounded questions and judge answers fairly \
    on technical accuracy, depth and clarity.";
