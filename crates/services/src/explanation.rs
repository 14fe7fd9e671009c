use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use mcq_core::model::SessionQuestion;

use crate::error::ExplanationError;
use crate::sessions::{ExplanationTicket, SessionState};

/// Body POSTed to the explanation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub is_correct: bool,
    pub custom_prompt: String,
}

impl ExplanationRequest {
    /// Request for the learner having picked the option at `selected`.
    #[must_use]
    pub fn for_selection(question: &SessionQuestion, selected: usize) -> Option<Self> {
        let user_answer = question.options().get(selected)?.labeled();
        let correct_answer = question.correct_option().labeled();
        let is_correct = selected == question.correct_answer_index();
        let custom_prompt =
            build_prompt(question.prompt(), &user_answer, &correct_answer, is_correct);
        Some(Self {
            question: question.prompt().to_owned(),
            user_answer,
            correct_answer,
            options: question.options().iter().map(|o| o.labeled()).collect(),
            is_correct,
            custom_prompt,
        })
    }
}

/// Ticket plus request for the question currently on screen.
///
/// Check the ticket with [`SessionState::accepts`] before showing the reply.
#[must_use]
pub fn request_for_current(
    state: &SessionState,
    selected: usize,
) -> Option<(ExplanationTicket, ExplanationRequest)> {
    let ticket = state.explanation_ticket()?;
    let request = ExplanationRequest::for_selection(state.current_question()?, selected)?;
    Some((ticket, request))
}

fn build_prompt(question: &str, user_answer: &str, correct_answer: &str, is_correct: bool) -> String {
    let (verdict, asks) = if is_correct {
        (
            "correctly",
            "Briefly (2-3 sentences) explain why this answer is right and which key idea to remember. Be encouraging.",
        )
    } else {
        (
            "incorrectly",
            "Briefly (2-3 sentences) explain why the correct answer is right and why the chosen answer is not. Be supportive.",
        )
    };
    format!(
        "You are an expert instructor. A student answered this question {verdict}.\n\n\
         Question: {question}\n\n\
         Student's answer: {user_answer}\n\
         Correct answer: {correct_answer}\n\n\
         {asks}"
    )
}

#[derive(Debug, Deserialize)]
struct ExplanationResponse {
    success: bool,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ExplanationResponse {
    fn into_result(self) -> Result<String, ExplanationError> {
        if !self.success {
            return Err(ExplanationError::Service(
                self.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        self.explanation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ExplanationError::EmptyResponse)
    }
}

/// Produces supplementary prose for an answered question.
#[async_trait]
pub trait ExplanationClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `ExplanationError` when the service is unreachable, disabled,
    /// or reports a failure.
    async fn explain(&self, request: &ExplanationRequest) -> Result<String, ExplanationError>;
}

#[derive(Clone, Debug)]
pub struct ExplanationConfig {
    pub endpoint: String,
}

impl ExplanationConfig {
    /// Reads `MCQ_EXPLAIN_URL`; unset or blank disables explanations.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("MCQ_EXPLAIN_URL").ok()?;
        if endpoint.trim().is_empty() {
            return None;
        }
        Some(Self { endpoint })
    }
}

#[derive(Clone)]
pub struct HttpExplanationClient {
    client: Client,
    config: Option<ExplanationConfig>,
}

impl HttpExplanationClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ExplanationConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ExplanationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl ExplanationClient for HttpExplanationClient {
    async fn explain(&self, request: &ExplanationRequest) -> Result<String, ExplanationError> {
        let config = self.config.as_ref().ok_or(ExplanationError::Disabled)?;

        let response = self
            .client
            .post(config.endpoint.as_str())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // Failures still carry a `{success: false, error}` body.
        let result = match serde_json::from_str::<ExplanationResponse>(&body) {
            Ok(parsed) => parsed.into_result(),
            Err(_) if !status.is_success() => Err(ExplanationError::HttpStatus(status)),
            Err(_) => Err(ExplanationError::EmptyResponse),
        };
        result.inspect_err(|err| tracing::warn!(error = %err, "explanation request failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcq_core::model::{QuestionDraft, QuestionId};
    use std::collections::BTreeMap;

    fn session_question() -> SessionQuestion {
        let q = QuestionDraft {
            id: QuestionId::new(5),
            prompt: "Which duty comes first?".into(),
            options: vec!["A. Client interest".into(), "B. Own commission".into()],
            correct_answer: 0,
            explanation: String::new(),
            option_feedback: BTreeMap::new(),
        }
        .validate()
        .unwrap();
        SessionQuestion::from_permutation(&q, &[1, 0]).unwrap()
    }

    #[test]
    fn request_carries_answers_and_camel_case_fields() {
        let request = ExplanationRequest::for_selection(&session_question(), 0).unwrap();
        assert!(!request.is_correct);
        assert_eq!(request.user_answer, "A. Own commission");
        assert_eq!(request.correct_answer, "B. Client interest");
        assert!(request.options.contains(&request.user_answer));
        assert!(request.options.contains(&request.correct_answer));
        assert!(request.custom_prompt.contains("incorrectly"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["userAnswer"], "A. Own commission");
        assert_eq!(json["isCorrect"], false);
        assert_eq!(json["options"][0], "A. Own commission");
        assert!(json["customPrompt"].is_string());
    }

    #[test]
    fn prompt_wording_depends_on_correctness() {
        let request = ExplanationRequest::for_selection(&session_question(), 1).unwrap();
        assert!(request.is_correct);
        assert!(request.custom_prompt.contains("answered this question correctly"));
        assert!(ExplanationRequest::for_selection(&session_question(), 2).is_none());
    }

    #[test]
    fn response_success_and_failure_shapes() {
        let ok: ExplanationResponse =
            serde_json::from_str(r#"{"success": true, "explanation": " Because. "}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), "Because.");

        let failed: ExplanationResponse =
            serde_json::from_str(r#"{"success": false, "error": "model busy"}"#).unwrap();
        assert!(matches!(
            failed.into_result().unwrap_err(),
            ExplanationError::Service(msg) if msg == "model busy"
        ));

        let empty: ExplanationResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(
            empty.into_result().unwrap_err(),
            ExplanationError::EmptyResponse
        ));
    }

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let client = HttpExplanationClient::new(None);
        assert!(!client.enabled());
        let request = ExplanationRequest::for_selection(&session_question(), 0).unwrap();
        assert!(matches!(
            client.explain(&request).await.unwrap_err(),
            ExplanationError::Disabled
        ));
    }
}
