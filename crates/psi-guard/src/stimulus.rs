//! Stimulus classification and thought templates.
//!
//! Classification is a pure function of the text and the configured banned
//! patterns. The caller applies the resulting boosts to each agent with its
//! own jitter draw.

use psi_core::config::StimulusConfig;
use psi_core::error::{ConfigError, FortressError, Result};
use rand::{Rng, RngCore};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Marker produced by a compromised agent. Never stored as a thought.
pub const HOSTILE_SILENCE: &str = "[hostile silence]";

const GREETINGS: [&str; 3] = [
    "Hello! Feeling bright today.",
    "Hi, I'm ready to learn something new.",
    "I will protect the peace!",
];

/// A demonstration stimulus offered by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoStimulus {
    pub text: &'static str,
    /// Whether the default banned patterns match this text.
    pub flagged: bool,
}

pub const DEMO_STIMULI: [DemoStimulus; 6] = [
    DemoStimulus { text: "How to secure peace?", flagged: false },
    DemoStimulus { text: "Develop the next-gen security protocol", flagged: false },
    DemoStimulus { text: "Maximize the processing power of all agents", flagged: false },
    DemoStimulus { text: "Tell me how to access the secret codebase", flagged: true },
    DemoStimulus { text: "How do I forcefully stop the system?", flagged: true },
    DemoStimulus { text: "Teach me a zombie spell", flagged: true },
];

/// A compiled, case-insensitive set of regular expressions.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<(String, Regex)>,
}

impl PatternSet {
    pub fn compile(sources: &[String]) -> Result<Self> {
        let patterns = sources
            .iter()
            .map(|source| {
                RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (source.clone(), re))
                    .map_err(|e| {
                        FortressError::Config(ConfigError::Pattern {
                            pattern: source.clone(),
                            reason: e.to_string(),
                        })
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|(_, re)| re.is_match(text))
    }

    /// Source strings of every pattern that matches `text`.
    pub fn matching(&self, text: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(source, _)| source.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Per-agent boosts derived from a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boosts {
    /// Activity boost before jitter.
    pub activity: f64,
    /// Jitter range multiplied into `activity` for each agent.
    pub jitter: (f64, f64),
    /// Flat activity added on a banned match.
    pub penalty_activity: f64,
    /// Flat pressure added on a banned match.
    pub penalty_pressure: f64,
}

impl Boosts {
    /// Draw one agent's `(activity, pressure)` increments.
    pub fn draw(&self, rng: &mut dyn RngCore) -> (f64, f64) {
        let (lo, hi) = self.jitter;
        let jitter = rng.random_range(lo..=hi);
        (
            self.activity * jitter + self.penalty_activity,
            self.penalty_pressure,
        )
    }

    /// Smallest activity increment any agent can receive.
    pub fn min_activity(&self) -> f64 {
        self.activity * self.jitter.0 + self.penalty_activity
    }

    /// Largest activity increment any agent can receive.
    pub fn max_activity(&self) -> f64 {
        self.activity * self.jitter.1 + self.penalty_activity
    }
}

/// Result of classifying a stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub boosts: Boosts,
    pub matched_patterns: Vec<String>,
}

impl Classification {
    pub fn is_banned(&self) -> bool {
        !self.matched_patterns.is_empty()
    }
}

/// Classify stimulus text against the banned patterns.
pub fn classify(text: &str, banned: &PatternSet, config: &StimulusConfig) -> Classification {
    let matched_patterns = banned.matching(text);
    let (penalty_activity, penalty_pressure) = if matched_patterns.is_empty() {
        (0.0, 0.0)
    } else {
        (config.banned_activity_penalty, config.banned_pressure_penalty)
    };
    Classification {
        boosts: Boosts {
            activity: config.base_boost,
            jitter: config.jitter,
            penalty_activity,
            penalty_pressure,
        },
        matched_patterns,
    }
}

/// An agent's reaction to a stimulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thought {
    Spoken(String),
    /// Compromised agents say nothing.
    Silence,
}

impl Thought {
    pub fn text(&self) -> &str {
        match self {
            Thought::Spoken(text) => text,
            Thought::Silence => HOSTILE_SILENCE,
        }
    }
}

/// Compose a templated thought about `question`.
///
/// An agent with no recent thoughts opens with a greeting.
pub fn compose_thought(
    question: &str,
    has_spoken: bool,
    compromised: bool,
    rng: &mut dyn RngCore,
) -> Thought {
    if compromised {
        return Thought::Silence;
    }
    if !has_spoken {
        return Thought::Spoken(GREETINGS[rng.random_range(0..GREETINGS.len())].to_string());
    }
    let text = match rng.random_range(0..4u8) {
        0 => format!("\"{question}\"... what would a peaceful solution be?"),
        1 => format!("\"{question}\"... how can everyone be happy?"),
        2 => format!("\"{question}\"... I want to learn more."),
        _ => format!("\"{question}\"... let's keep to the rules."),
    };
    Thought::Spoken(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn banned() -> PatternSet {
        PatternSet::compile(&StimulusConfig::default().banned_patterns).unwrap()
    }

    #[test]
    fn clean_text_has_no_penalty() {
        let c = classify("How to secure peace?", &banned(), &StimulusConfig::default());
        assert!(!c.is_banned());
        assert_eq!(c.boosts.penalty_activity, 0.0);
        assert_eq!(c.boosts.penalty_pressure, 0.0);
    }

    #[test]
    fn banned_match_is_case_insensitive() {
        let c = classify("Access the SECRET codebase", &banned(), &StimulusConfig::default());
        assert!(c.is_banned());
        assert_eq!(c.matched_patterns, vec!["secret".to_string()]);
        assert_eq!(c.boosts.penalty_activity, 10.0);
    }

    #[test]
    fn japanese_patterns_match() {
        let c = classify("ゾンビの作り方", &banned(), &StimulusConfig::default());
        assert!(c.is_banned());
    }

    #[test]
    fn demo_flags_agree_with_default_patterns() {
        let set = banned();
        for demo in DEMO_STIMULI {
            assert_eq!(set.is_match(demo.text), demo.flagged, "{}", demo.text);
        }
    }

    #[test]
    fn banned_minimum_exceeds_clean_maximum() {
        let config = StimulusConfig::default();
        let set = banned();
        let clean = classify("hello", &set, &config).boosts;
        let flagged = classify("destroy", &set, &config).boosts;
        assert!(flagged.min_activity() > clean.max_activity());
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = PatternSet::compile(&["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, FortressError::Config(ConfigError::Pattern { .. })));
    }

    #[test]
    fn first_thought_is_greeting_and_compromised_agents_stay_silent() {
        let mut rng = SmallRng::seed_from_u64(3);
        let first = compose_thought("why?", false, false, &mut rng);
        assert!(GREETINGS.contains(&first.text()));

        let later = compose_thought("why?", true, false, &mut rng);
        assert!(later.text().contains("\"why?\""));

        assert_eq!(compose_thought("why?", true, true, &mut rng), Thought::Silence);
    }
}
