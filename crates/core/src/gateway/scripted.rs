use async_trait::async_trait;

use super::{Cue, GatewayError, LanguageModelGateway, parse_grading};
use crate::{
    grading::{GradeReport, GradeStatus},
    topic::{CATALOG, Topic},
    transcript::Transcript,
};

const SKIP_PREFIX: &str = "[Student hasn't learned:";

/// A deterministic gateway that needs no network access.
///
/// Questions are built from the catalog, and grading awards points for every
/// answer that uses at least one catalog key term. Useful for classroom demos
/// without an API key and for integration testing.
pub struct ScriptedGateway {
    pass_threshold: u8,
}

impl ScriptedGateway {
    pub fn new(pass_threshold: u8) -> Self {
        Self { pass_threshold }
    }

    fn question(topic: &Topic) -> String {
        format!(
            "How would you explain {} to a friend? Try to bring in ideas like {}.",
            topic.name,
            topic.keywords.iter().take(2).copied().collect::<Vec<_>>().join(" or ")
        )
    }

    /// Scores the share of answers that mention a key term.
    fn score(transcript: &str) -> (u8, usize) {
        let answers: Vec<String> = transcript
            .split("\n\n")
            .filter_map(|block| block.strip_prefix("Student: "))
            .filter(|text| !text.starts_with(SKIP_PREFIX))
            .map(str::to_lowercase)
            .collect();

        if answers.is_empty() {
            return (0, 0);
        }

        let on_topic = answers
            .iter()
            .filter(|answer| {
                CATALOG
                    .iter()
                    .flat_map(|t| t.keywords.iter())
                    .any(|kw| answer.contains(&kw.to_lowercase()))
            })
            .count();

        ((on_topic * 100 / answers.len()) as u8, answers.len())
    }
}

#[async_trait]
impl LanguageModelGateway for ScriptedGateway {
    async fn converse(
        &self,
        _history: &Transcript,
        plan: &'static [Topic],
        cue: Cue,
    ) -> Result<String, GatewayError> {
        let reply = match cue {
            Cue::Opening => {
                let first = plan
                    .first()
                    .ok_or_else(|| GatewayError::Unavailable("no topics planned".to_string()))?;
                format!(
                    "Hi there! 😊 Let's reflect on {}. {}",
                    first.name,
                    Self::question(first)
                )
            }
            Cue::FollowUp { next } => format!(
                "Thanks for sharing that! Now let's think about {}. {}",
                next.name,
                Self::question(next)
            ),
            Cue::Skipped { skipped, next } => format!(
                "No worries, {} hasn't come up in class yet. Let's look at {} instead. {}",
                skipped.name,
                next.name,
                Self::question(next)
            ),
        };
        Ok(reply)
    }

    async fn grade(&self, transcript: &str) -> Result<GradeReport, GatewayError> {
        let (score, answers) = Self::score(transcript);
        let status = GradeStatus::for_score(score, self.pass_threshold);
        let response = format!(
            "Score: {score}\nStatus: {status}\nFeedback: {answers} answer(s) reviewed; key physics terms were used in {score}% of them."
        );
        parse_grading(&response)
    }
}
