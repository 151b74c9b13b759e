//! Tie-breaking between equally good catalog candidates.

use std::sync::Arc;

use shelfwise_ai::CompletionClient;
use shelfwise_ai::prompts::{SELECTION_SYSTEM, parse_selection, selection_prompt};
use shelfwise_core::config::Preferences;
use shelfwise_core::models::CandidateRecord;
use tracing::{debug, info, warn};

use crate::prompt::Prompter;

/// Rating thresholds used when nobody else decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicPolicy {
    pub min_rating: f64,
    pub min_rating_people: u64,
}

impl HeuristicPolicy {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            min_rating: prefs.min_rating,
            min_rating_people: prefs.min_rating_people,
        }
    }

    /// Highest-similarity candidate meeting both thresholds, else the first one.
    pub fn pick(&self, tie: &[CandidateRecord]) -> usize {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in tie.iter().enumerate() {
            let qualified =
                c.rating_value() >= self.min_rating && c.rating_people_count() >= self.min_rating_people;
            if qualified && best.is_none_or(|(_, s)| c.title_similarity > s) {
                best = Some((i, c.title_similarity));
            }
        }
        match best {
            Some((i, _)) => i,
            None => {
                debug!("no candidate meets the rating thresholds, taking the first");
                0
            }
        }
    }
}

/// One tie-breaking strategy, chosen once per run.
#[derive(Clone)]
pub enum Resolver {
    /// Reasoning service, with the heuristic absorbing any failure.
    Arbiter {
        client: Arc<dyn CompletionClient>,
        fallback: HeuristicPolicy,
    },
    Heuristic(HeuristicPolicy),
    /// Blocks on the operator until a valid position is entered.
    Interactive(Arc<dyn Prompter>),
}

impl Resolver {
    /// Index into `tie` of the chosen candidate. Never fails; `tie` must be non-empty.
    pub async fn choose(&self, tie: &[CandidateRecord]) -> usize {
        match self {
            Resolver::Heuristic(policy) => policy.pick(tie),
            Resolver::Arbiter { client, fallback } => {
                let prompt = selection_prompt(tie);
                match client.complete(&prompt, Some(SELECTION_SYSTEM)).await {
                    Ok(reply) => match parse_selection(&reply, tie.len()) {
                        Some(i) => {
                            info!(choice = i + 1, "arbiter picked candidate");
                            i
                        }
                        None => {
                            warn!(reply = %reply.lines().next().unwrap_or_default(), "arbiter reply unusable, using heuristic");
                            fallback.pick(tie)
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "arbiter unavailable, using heuristic");
                        fallback.pick(tie)
                    }
                }
            }
            Resolver::Interactive(prompter) => choose_interactively(prompter.as_ref(), tie),
        }
    }
}

fn choose_interactively(prompter: &dyn Prompter, tie: &[CandidateRecord]) -> usize {
    prompter.say("Several catalog entries match equally well:");
    for (i, c) in tie.iter().enumerate() {
        prompter.say(&format!(
            "  [{}] {} | {} | {} | {} | rating {} ({} ratings) | similarity {:.2}",
            i + 1,
            c.title,
            c.author,
            c.publisher.as_deref().unwrap_or("-"),
            c.year.as_deref().unwrap_or("-"),
            c.rating.as_deref().unwrap_or("-"),
            c.rating_people.as_deref().unwrap_or("0"),
            c.title_similarity,
        ));
    }

    loop {
        let Some(answer) = prompter.ask(&format!("Choose 1-{}: ", tie.len())) else {
            warn!("input closed, taking the first candidate");
            return 0;
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=tie.len()).contains(&n) => return n - 1,
            _ => prompter.say(&format!("Please enter a number between 1 and {}.", tie.len())),
        }
    }
}
