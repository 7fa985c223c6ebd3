//! Gemini-backed AI collaborator
//!
//! Calls the `generateContent` REST endpoint with a response schema so
//! the model answers in constrained JSON. Report generation asks for
//! `{diagnosis, justification, questions}`; scoring asks for
//! `{score, feedback}` and keeps only the coerced score.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use ateneo_core::{coerce_score, AiReport, CaseOracle, Error as AiError, Result as AiResult};

const REPORT_SYSTEM_PROMPT: &str =
    "You are a medical AI model specialized in diagnosis and clinical decision making. \
     Analyze the following clinical case and produce an AI report that will serve as the \
     starting point for a refutation debate. The report must be formal and structured: a \
     primary diagnosis (which is not always correct), a concise justification, and exactly \
     three critical questions for the debate. The output is a simulation for professional \
     training, never medical advice. Respond with a JSON object only.";

const SCORING_SYSTEM_PROMPT: &str =
    "You act as an impartial judge and expert in clinical reasoning. Evaluate the \
     professional's refutation against the initial AI report, judging quality, evidence \
     and coherence. The scale is 0 to 100 points; award a high score (90+) only to a very \
     strong refutation. Respond with a JSON object containing an integer 'score' (0-100) \
     and a short 'feedback'.";

/// AI collaborator backed by the Gemini API
#[derive(Clone)]
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiOracle {
    /// Create a new oracle. Requests time out after `timeout`, which the
    /// caller treats as a transient failure.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }

    /// One schema-constrained generation call, returning the raw JSON
    /// text of the first candidate.
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        response_schema: Value,
    ) -> AiResult<String> {
        let request_body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "systemInstruction": {
                "parts": [{ "text": system_instruction }]
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Transient("Gemini request timed out".to_string())
                } else {
                    AiError::Transient(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_client_error() {
            // The service rejected the input; retrying will not help.
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Permanent(format!(
                "Gemini rejected the request ({}): {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Transient(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let resp_json: Value = response
            .json()
            .await
            .map_err(|e| AiError::Transient(format!("invalid Gemini response body: {}", e)))?;

        extract_candidate_text(&resp_json)
            .map(str::to_string)
            .ok_or_else(|| AiError::Transient("Gemini response missing candidate text".to_string()))
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response envelope
fn extract_candidate_text(body: &Value) -> Option<&str> {
    body["candidates"][0]["content"]["parts"][0]["text"].as_str()
}

fn report_schema() -> Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "diagnosis": {
                "type": "STRING",
                "description": "Primary diagnosis proposed by the AI."
            },
            "justification": {
                "type": "STRING",
                "description": "Concise justification for the diagnosis."
            },
            "questions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Exactly three critical questions for the debate."
            }
        },
        "required": ["diagnosis", "justification", "questions"]
    })
}

fn score_schema() -> Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "score": {
                "type": "INTEGER",
                "description": "Score from 0 to 100."
            },
            "feedback": {
                "type": "STRING",
                "description": "Concise feedback on the refutation."
            }
        },
        "required": ["score", "feedback"]
    })
}

#[async_trait]
impl CaseOracle for GeminiOracle {
    async fn generate_report(&self, case_text: &str) -> AiResult<AiReport> {
        let prompt = format!("Clinical case for analysis: {}", case_text);
        let text = self
            .generate(REPORT_SYSTEM_PROMPT, &prompt, report_schema())
            .await?;

        // Shape violations count as transient: the model may produce a
        // well-formed report on the next attempt.
        let report = AiReport::parse(&text)?;
        tracing::debug!(diagnosis = %report.diagnosis, "Generated case report");
        Ok(report)
    }

    async fn score_refutation(&self, report: &AiReport, refutation: &str) -> AiResult<u8> {
        let prompt = format!(
            "Initial AI report:\nDiagnosis: {}\nJustification: {}\nKey questions: {}\n\n\
             Professional's refutation to evaluate:\n{}",
            report.diagnosis,
            report.justification,
            report.questions.join(", "),
            refutation
        );
        let text = self
            .generate(SCORING_SYSTEM_PROMPT, &prompt, score_schema())
            .await?;

        let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let score = coerce_score(value.get("score").and_then(Value::as_i64));
        tracing::debug!(score, "Scored refutation");
        Ok(score)
    }
}
