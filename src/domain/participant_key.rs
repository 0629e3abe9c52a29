use std::fmt;

use super::Username;

/// Never legal inside a [`Username`], so joined keys cannot collide.
pub const PARTICIPANT_KEY_SEPARATOR: char = ':';

/// Order-independent identity of a two-person conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantKey(String);

impl ParticipantKey {
    pub fn new(a: &Username, b: &Username) -> Self {
        let [first, second] = Self::canonical_pair(a, b);
        Self(format!(
            "{}{}{}",
            first, PARTICIPANT_KEY_SEPARATOR, second
        ))
    }

    /// Returns the pair sorted lexicographically: `[min, max]`.
    pub fn canonical_pair(a: &Username, b: &Username) -> [Username; 2] {
        if a <= b {
            [a.clone(), b.clone()]
        } else {
            [b.clone(), a.clone()]
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
