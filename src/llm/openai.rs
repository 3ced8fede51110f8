//! OpenAI chat-completions call used by the improve-text service.
//!
//! Non-streaming: improvement of a journal page is a single bounded rewrite,
//! not an interactive stream.

use super::improve::ImproveError;
use super::prompts::{
    build_improve_message, IMPROVE_MAX_TOKENS, IMPROVE_MODEL, IMPROVE_SYSTEM_PROMPT,
    IMPROVE_TEMPERATURE,
};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Run the improvement prompt against the completion model and return the
/// rewritten text. Empty completions count as upstream failures.
pub async fn complete_improvement(
    http: &reqwest::Client,
    api_key: &str,
    text: &str,
) -> Result<String, ImproveError> {
    let start = std::time::Instant::now();
    let response = http
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .header("content-type", "application/json")
        .json(&serde_json::json!({
            "model": IMPROVE_MODEL,
            "messages": [
                { "role": "system", "content": IMPROVE_SYSTEM_PROMPT },
                { "role": "user", "content": build_improve_message(text) }
            ],
            "max_tokens": IMPROVE_MAX_TOKENS,
            "temperature": IMPROVE_TEMPERATURE,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("[LLM] OpenAI API returned {status}: {body}");
        return Err(ImproveError::Upstream(format!("OpenAI API error: {status}")));
    }

    let body: serde_json::Value = response.json().await?;
    let improved = extract_completion_text(&body)
        .ok_or_else(|| ImproveError::Upstream("no improved text returned".to_string()))?;

    log::info!(
        "[LLM] Model: {}, completion in {}ms",
        IMPROVE_MODEL,
        start.elapsed().as_millis()
    );
    Ok(improved)
}

/// Completion text lives at choices[0].message.content.
fn extract_completion_text(body: &serde_json::Value) -> Option<String> {
    let content = body
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
