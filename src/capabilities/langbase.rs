use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CompletionLimits, HypothesisCandidate, HypothesisGenerator, ParentContext, RelatedRecord, TextGenerator};
use crate::config::Config;
use crate::error::{GenerationError, GenerationResult};
use crate::langbase::{LangbaseClient, Message, PipeRequest, PipeSpec, DEFAULT_PIPE_TEMPERATURE};
use crate::prompts::{HYPOTHESIS_GENERATION_PROMPT, REPORT_PROMPT};

/// Extract JSON from a completion, handling markdown code blocks.
///
/// Tries, in order: raw JSON, a ```json fenced block, a plain ``` block.
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if let Some(rest) = completion.split("```json").nth(1) {
        return rest
            .split("```")
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty".to_string());
    }

    if let Some(block) = completion.split("```").nth(1) {
        let block = block.trim();
        if !block.is_empty() {
            return Ok(block);
        }
        return Err("Found ``` block but content was empty".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidatePayload {
    Wrapped { hypotheses: Vec<HypothesisCandidate> },
    Bare(Vec<HypothesisCandidate>),
}

/// Parse a hypothesis pipe completion into candidates.
pub(crate) fn parse_candidates(completion: &str) -> GenerationResult<Vec<HypothesisCandidate>> {
    let json = extract_json_from_completion(completion)
        .map_err(|message| GenerationError::Malformed { message })?;

    let payload: CandidatePayload =
        serde_json::from_str(json).map_err(|e| GenerationError::Malformed {
            message: format!("Hypothesis payload did not match schema: {}", e),
        })?;

    let candidates = match payload {
        CandidatePayload::Wrapped { hypotheses } => hypotheses,
        CandidatePayload::Bare(list) => list,
    };

    if let Some(bad) = candidates
        .iter()
        .find(|c| !(0.0..=1.0).contains(&c.confidence))
    {
        return Err(GenerationError::Malformed {
            message: format!(
                "Confidence {} for '{}' is outside [0, 1]",
                bad.confidence, bad.title
            ),
        });
    }

    Ok(candidates)
}

/// Hypothesis generation backed by a Langbase pipe.
#[derive(Clone)]
pub struct LangbaseHypothesisGenerator {
    client: LangbaseClient,
    pipe_name: String,
}

impl LangbaseHypothesisGenerator {
    /// Create a new generator running the configured hypothesis pipe.
    pub fn new(client: LangbaseClient, config: &Config) -> Self {
        Self {
            client,
            pipe_name: config.pipes.hypothesis.clone(),
        }
    }

    /// Pipe definition used to provision the hypothesis pipe.
    pub fn pipe_spec(&self) -> PipeSpec {
        PipeSpec {
            name: self.pipe_name.clone(),
            description: "Breach investigation hypothesis generation".to_string(),
            system_prompt: HYPOTHESIS_GENERATION_PROMPT.to_string(),
            json_output: true,
            max_tokens: 2000,
            temperature: DEFAULT_PIPE_TEMPERATURE,
        }
    }

    fn build_messages(parent: &ParentContext, related: &[RelatedRecord], fan_out: usize) -> Vec<Message> {
        let mut content = format!(
            "Investigation path: {}\n\nHypothesis to expand:\nTitle: {}\nType: {}\nDescription: {}\n",
            parent.path.join(" -> "),
            parent.title,
            parent.node_type,
            parent.description,
        );

        if !related.is_empty() {
            content.push_str("\nRelated vulnerabilities:\n");
            for record in related {
                content.push_str(&format!("- {}: {}\n", record.id, record.description));
            }
        }

        content.push_str(&format!(
            "\nPropose exactly {} child hypotheses.",
            fan_out
        ));

        vec![
            Message::system(HYPOTHESIS_GENERATION_PROMPT),
            Message::user(content),
        ]
    }
}

#[async_trait]
impl HypothesisGenerator for LangbaseHypothesisGenerator {
    async fn generate(
        &self,
        parent: &ParentContext,
        related: &[RelatedRecord],
        fan_out: usize,
    ) -> GenerationResult<Vec<HypothesisCandidate>> {
        let messages = Self::build_messages(parent, related, fan_out);
        let request = PipeRequest::new(&self.pipe_name, messages);

        let response = self.client.call_pipe(request).await?;
        debug!(
            parent_id = %parent.id,
            completion_len = response.completion.len(),
            "Hypothesis completion received"
        );

        let candidates = parse_candidates(&response.completion).map_err(|e| {
            warn!(parent_id = %parent.id, error = %e, "Unusable hypothesis completion");
            e
        })?;

        info!(
            parent_id = %parent.id,
            requested = fan_out,
            returned = candidates.len(),
            "Hypotheses generated"
        );
        Ok(candidates)
    }
}

/// Free-form completion backed by the report pipes.
///
/// Langbase applies token and temperature limits per pipe, so each
/// [`CompletionLimits`] preset has its own pipe provisioned with those limits.
/// Limits other than [`CompletionLimits::RECOMMENDATIONS`] run on the summary pipe.
#[derive(Clone)]
pub struct LangbaseTextGenerator {
    client: LangbaseClient,
    summary_pipe: String,
    recommendations_pipe: String,
}

impl LangbaseTextGenerator {
    /// Create a new generator running the configured report pipes.
    pub fn new(client: LangbaseClient, config: &Config) -> Self {
        Self {
            client,
            summary_pipe: config.pipes.report.clone(),
            recommendations_pipe: config.pipes.recommendations.clone(),
        }
    }

    /// Pipe definitions used to provision the summary and recommendations pipes.
    pub fn pipe_specs(&self) -> [PipeSpec; 2] {
        [
            Self::spec(
                &self.summary_pipe,
                "Breach investigation summary writing",
                CompletionLimits::SUMMARY,
            ),
            Self::spec(
                &self.recommendations_pipe,
                "Breach investigation security recommendations",
                CompletionLimits::RECOMMENDATIONS,
            ),
        ]
    }

    /// Pipe that enforces `limits`.
    pub fn pipe_for(&self, limits: CompletionLimits) -> &str {
        if limits == CompletionLimits::RECOMMENDATIONS {
            &self.recommendations_pipe
        } else {
            &self.summary_pipe
        }
    }

    fn spec(name: &str, description: &str, limits: CompletionLimits) -> PipeSpec {
        PipeSpec {
            name: name.to_string(),
            description: description.to_string(),
            system_prompt: REPORT_PROMPT.to_string(),
            json_output: false,
            max_tokens: limits.max_tokens,
            temperature: limits.temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for LangbaseTextGenerator {
    async fn complete(&self, prompt: &str, limits: CompletionLimits) -> GenerationResult<String> {
        let request = PipeRequest::new(
            self.pipe_for(limits),
            vec![Message::system(REPORT_PROMPT), Message::user(prompt)],
        );

        let response = self.client.call_pipe(request).await?;
        let text = response.completion.trim();
        if text.is_empty() {
            return Err(GenerationError::Malformed {
                message: "Empty completion".to_string(),
            });
        }
        Ok(text.to_string())
    }
}
