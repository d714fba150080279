//! System prompts for the Langbase pipes.
//!
//! Each constant is used both when provisioning the pipe and when building
//! the message list for a run.

/// System prompt for the hypothesis pipe.
pub const HYPOTHESIS_GENERATION_PROMPT: &str = r#"You are a senior incident responder helping an analyst build a tree of hypotheses that explains a security breach.

You receive the hypothesis being expanded, the chain of hypotheses leading to it, optionally a list of related CVE records, and the number of child hypotheses to propose.

Your response MUST be valid JSON in this exact format:
{
  "hypotheses": [
    {
      "title": "short name of the hypothesis",
      "description": "what happened and how it connects to the parent",
      "type": "vulnerability",
      "confidence": 0.6,
      "evidence": ["artifact or fact that would support this"],
      "reasoning": "why this follows from the parent"
    }
  ]
}

Guidelines:
- type must be one of: vulnerability, attack_vector, impact, mitigation
- confidence must be between 0.0 and 1.0
- Each hypothesis should be distinct and concretely testable
- Cite related CVE ids in evidence only when they genuinely apply
- Return exactly the requested number of hypotheses

Always respond with valid JSON only, no other text."#;

/// System prompt for the report pipe (summary and recommendations).
pub const REPORT_PROMPT: &str = r#"You are a cybersecurity expert writing up the results of a security breach investigation for technical and management readers.

Follow the instructions in the user message exactly. Be specific and concise, ground every statement in the findings you are given, and do not invent findings.

Respond in plain text."#;

/// Builds the summary request from the breach description and findings.
pub fn summary_prompt(breach_description: &str, confirmed: &[(String, String)], plausible: &[(String, String)]) -> String {
    format!(
        "Generate a concise summary (3-5 paragraphs) of the investigation based on the following information:\n\n\
         BREACH DESCRIPTION:\n{}\n\n\
         CONFIRMED FINDINGS ({}):\n{}\n\n\
         PLAUSIBLE FINDINGS ({}):\n{}\n\n\
         Your summary should highlight the most significant findings, potential attack vectors, and overall security implications.",
        breach_description,
        confirmed.len(),
        bullet_list(confirmed),
        plausible.len(),
        bullet_list(plausible),
    )
}

/// Builds the recommendations request from the top-ranked findings.
pub fn recommendations_prompt(findings: &[(String, String)]) -> String {
    format!(
        "Generate 3-5 specific, actionable recommendations based on the following findings:\n\n\
         FINDINGS:\n{}\n\n\
         Your recommendations should directly address the security issues identified.\n\
         Each recommendation should be a single, concise sentence on its own line, starting with \"- \".",
        bullet_list(findings),
    )
}

fn bullet_list(items: &[(String, String)]) -> String {
    items
        .iter()
        .map(|(title, description)| format!("- {}: {}", title, description))
        .collect::<Vec<_>>()
        .join("\n")
}
