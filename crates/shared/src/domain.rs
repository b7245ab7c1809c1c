use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! key_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(ModuleId);
key_newtype!(ChallengeId);
key_newtype!(AchievementId);
key_newtype!(AgentId);

impl ModuleId {
    /// The module whose completion unlocks this one. `None` for the first module.
    pub fn predecessor(self) -> Option<ModuleId> {
        (self.0 > 1).then(|| ModuleId(self.0 - 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Capstone,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Capstone => "Capstone",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Tutor,
}

/// Learner progress. Mutated only by the progression engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub xp: u64,
    pub completed_modules: BTreeSet<ModuleId>,
    pub completed_challenges: BTreeSet<ChallengeId>,
    pub streak: u32,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            xp: 0,
            completed_modules: BTreeSet::new(),
            completed_challenges: BTreeSet::new(),
            streak: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub analogy: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, text)
    }

    pub fn tutor(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::Tutor, text)
    }

    fn plain(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            code: String::new(),
            analogy: String::new(),
            follow_ups: Vec::new(),
            sent_at: Utc::now(),
        }
    }
}
