use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Cue, GatewayError, LanguageModelGateway, parse_grading};
use crate::{
    grading::GradeReport,
    prompts::PromptSet,
    topic::Topic,
    transcript::{Speaker, Transcript},
};

/// A gateway for any OpenAI-compatible chat completion API.
///
/// The API is stateless, so every `converse` call replays the whole
/// conversation: the hidden opening prompt first, then the transcript, with
/// the steering instruction attached to the student's latest input.
pub struct OpenAICompatibleGateway {
    client: Client<OpenAIConfig>,
    chat_model: String,
    grading_model: String,
    prompts: PromptSet,
}

impl OpenAICompatibleGateway {
    /// Creates a new gateway.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL (OpenAI, or Gemini's OpenAI endpoint).
    /// * `chat_model` - Model used for the conversation.
    /// * `grading_model` - Model used to grade finished transcripts.
    /// * `prompts` - The loaded prompt templates.
    pub fn new(
        config: OpenAIConfig,
        chat_model: String,
        grading_model: String,
        prompts: PromptSet,
    ) -> Self {
        Self {
            client: Client::with_config(config),
            chat_model,
            grading_model,
            prompts,
        }
    }

    /// Builds the message list replayed to the model for one `converse` call.
    fn conversation(
        &self,
        history: &Transcript,
        plan: &[Topic],
        cue: Cue,
    ) -> Result<Vec<ChatCompletionRequestMessage>, GatewayError> {
        let mut messages = vec![user_message(self.prompts.session_opening(plan))?];
        let latest = history.len().checked_sub(1);

        for (i, entry) in history.entries().iter().enumerate() {
            let message = match entry.speaker {
                Speaker::Assistant => assistant_message(entry.text.clone())?,
                Speaker::Student if Some(i) == latest => {
                    user_message(self.steer(&entry.text, cue))?
                }
                Speaker::Student => user_message(entry.text.clone())?,
            };
            messages.push(message);
        }
        Ok(messages)
    }

    /// Attaches the instruction for `cue` to the student's latest input.
    fn steer(&self, text: &str, cue: Cue) -> String {
        match cue {
            Cue::Opening => text.to_string(),
            Cue::FollowUp { next } => format!(
                "{text}\n\n[INSTRUCTION TO AI: {}]",
                self.prompts.follow_up(next)
            ),
            // The skip marker carries no content of its own.
            Cue::Skipped { skipped, next } => self.prompts.skip_topic(skipped, next),
        }
    }

    /// Runs one chat completion and returns the first choice's text, if any.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<Option<String>, GatewayError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()
            .map_err(GatewayError::unavailable)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(GatewayError::unavailable)?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty()))
    }
}

#[async_trait]
impl LanguageModelGateway for OpenAICompatibleGateway {
    #[instrument(skip_all, fields(model = %self.chat_model, entries = history.len()))]
    async fn converse(
        &self,
        history: &Transcript,
        plan: &'static [Topic],
        cue: Cue,
    ) -> Result<String, GatewayError> {
        let messages = self.conversation(history, plan, cue)?;
        let reply = self
            .complete(&self.chat_model, messages)
            .await?
            .ok_or_else(|| GatewayError::Unavailable("No content in LLM response".to_string()))?;
        debug!(chars = reply.len(), "Received assistant reply");
        Ok(reply)
    }

    #[instrument(skip_all, fields(model = %self.grading_model))]
    async fn grade(&self, transcript: &str) -> Result<GradeReport, GatewayError> {
        let prompt = self.prompts.grade_transcript(transcript);
        let response = self
            .complete(&self.grading_model, vec![user_message(prompt)?])
            .await?
            .ok_or_else(|| GatewayError::MalformedGrading("empty grading response".to_string()))?;
        parse_grading(&response)
    }
}

fn user_message(content: String) -> Result<ChatCompletionRequestMessage, GatewayError> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()
        .map_err(GatewayError::unavailable)?
        .into())
}

fn assistant_message(content: String) -> Result<ChatCompletionRequestMessage, GatewayError> {
    Ok(ChatCompletionRequestAssistantMessageArgs::default()
        .content(content)
        .build()
        .map_err(GatewayError::unavailable)?
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{FOLLOW_UP, GRADE_TRANSCRIPT, SESSION_OPENING, SKIP_TOPIC};
    use crate::session::{Advance, Session};
    use crate::topic::{CATALOG, window};
    use async_openai::types::{
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestUserMessageContent,
    };
    use std::collections::HashMap;

    fn gateway() -> OpenAICompatibleGateway {
        let prompts = PromptSet::from_map(&HashMap::from([
            (SESSION_OPENING.to_string(), "Plan: {topic_list}".to_string()),
            (FOLLOW_UP.to_string(), "Next: {next_topic}".to_string()),
            (
                SKIP_TOPIC.to_string(),
                "Skipped {skipped_topic}; next {next_topic}".to_string(),
            ),
            (GRADE_TRANSCRIPT.to_string(), "{transcript}".to_string()),
        ]))
        .unwrap();
        OpenAICompatibleGateway::new(
            OpenAIConfig::new().with_api_key("test-key"),
            "chat".to_string(),
            "grader".to_string(),
            prompts,
        )
    }

    fn user_text(message: &ChatCompletionRequestMessage) -> String {
        match message {
            ChatCompletionRequestMessage::User(m) => match &m.content {
                ChatCompletionRequestUserMessageContent::Text(text) => text.clone(),
                other => panic!("unexpected user content: {other:?}"),
            },
            other => panic!("expected a user message, got {other:?}"),
        }
    }

    fn assistant_text(message: &ChatCompletionRequestMessage) -> String {
        match message {
            ChatCompletionRequestMessage::Assistant(m) => match &m.content {
                Some(ChatCompletionRequestAssistantMessageContent::Text(text)) => text.clone(),
                other => panic!("unexpected assistant content: {other:?}"),
            },
            other => panic!("expected an assistant message, got {other:?}"),
        }
    }

    #[test]
    fn opening_sends_only_the_plan() {
        let messages = gateway()
            .conversation(&Transcript::new(), window(0, 2), Cue::Opening)
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(
            user_text(&messages[0]),
            "Plan: 1. Simple Harmonic Motion\n2. Pendulum and Mass Spring"
        );
    }

    #[test]
    fn follow_up_steers_the_latest_answer_only() {
        let mut history = Transcript::new();
        history.push(Speaker::Assistant, "Q1");
        history.push(Speaker::Student, "A1");
        history.push(Speaker::Assistant, "Q2");
        history.push(Speaker::Student, "A2");

        let messages = gateway()
            .conversation(
                &history,
                window(0, 5),
                Cue::FollowUp {
                    next: &CATALOG[2],
                },
            )
            .unwrap();

        assert_eq!(messages.len(), 5);
        assert_eq!(assistant_text(&messages[1]), "Q1");
        assert_eq!(user_text(&messages[2]), "A1");
        assert_eq!(
            user_text(&messages[4]),
            "A2\n\n[INSTRUCTION TO AI: Next: Wave form]"
        );
    }

    #[test]
    fn skip_replaces_the_marker_with_the_instruction() {
        let mut history = Transcript::new();
        history.push(Speaker::Assistant, "Q1");
        history.push(Speaker::Student, "[Student hasn't learned: ...]");

        let messages = gateway()
            .conversation(
                &history,
                window(0, 5),
                Cue::Skipped {
                    skipped: &CATALOG[0],
                    next: &CATALOG[1],
                },
            )
            .unwrap();

        assert_eq!(
            user_text(&messages[2]),
            "Skipped Simple Harmonic Motion; next Pendulum and Mass Spring"
        );
    }

    #[test]
    fn replayed_plan_reaches_past_skipped_topics() {
        let mut session = Session::new("S1", 0, 5);
        session.push_reply("Q1");
        let mut cue = Cue::Opening;
        for _ in 0..5 {
            if let Advance::Ask(next) = session.record_skip() {
                cue = next;
            }
        }

        let messages = gateway()
            .conversation(session.transcript(), session.plan(), cue)
            .unwrap();
        let opening = user_text(&messages[0]);
        assert!(opening.contains(&format!("6. {}", CATALOG[5].name)), "{opening}");
        assert!(opening.contains(&format!("10. {}", CATALOG[9].name)), "{opening}");
        assert_eq!(
            user_text(messages.last().unwrap()),
            format!("Skipped {}; next {}", CATALOG[4].name, CATALOG[5].name)
        );
    }
}
