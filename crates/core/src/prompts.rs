//! Prompt Templates
//!
//! The four templates that drive the hosted model, loaded once at startup.
//! Placeholders use `{name}` syntax and are substituted verbatim.

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::topic::Topic;

pub const SESSION_OPENING: &str = "session_opening";
pub const FOLLOW_UP: &str = "follow_up";
pub const SKIP_TOPIC: &str = "skip_topic";
pub const GRADE_TRANSCRIPT: &str = "grade_transcript";

#[derive(Debug, Clone)]
pub struct PromptSet {
    session_opening: String,
    follow_up: String,
    skip_topic: String,
    grade_transcript: String,
}

impl PromptSet {
    /// Builds the set from a map keyed by template name (the prompt file stem).
    pub fn from_map(prompts: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            prompts
                .get(key)
                .cloned()
                .with_context(|| format!("Missing prompt template: '{key}'"))
        };
        Ok(Self {
            session_opening: get(SESSION_OPENING)?,
            follow_up: get(FOLLOW_UP)?,
            skip_topic: get(SKIP_TOPIC)?,
            grade_transcript: get(GRADE_TRANSCRIPT)?,
        })
    }

    /// The hidden first message of every conversation. `topics` are the
    /// topics the session is planned to cover, in order.
    pub fn session_opening(&self, topics: &[Topic]) -> String {
        let topic_list = topics
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.name))
            .collect::<Vec<_>>()
            .join("\n");
        let first_topic = topics.first().map(|t| t.name).unwrap_or_default();

        self.session_opening
            .replace("{topic_list}", &topic_list)
            .replace("{topic_count}", &topics.len().to_string())
            .replace("{first_topic}", first_topic)
    }

    /// Appended to the student's answer to steer the reply toward `next`.
    pub fn follow_up(&self, next: &Topic) -> String {
        self.follow_up.replace("{next_topic}", next.name)
    }

    pub fn skip_topic(&self, skipped: &Topic, next: &Topic) -> String {
        self.skip_topic
            .replace("{skipped_topic}", skipped.name)
            .replace("{next_topic}", next.name)
    }

    pub fn grade_transcript(&self, transcript: &str) -> String {
        self.grade_transcript.replace("{transcript}", transcript)
    }
}
