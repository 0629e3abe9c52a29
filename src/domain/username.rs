use std::fmt;
use std::str::FromStr;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 16;

/// A validated username: 3 to 16 ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let length = raw.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
            return Err(format!(
                "Invalid username: {}. Expected {} to {} characters",
                raw, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            ));
        }

        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "Invalid username: {}. Only letters and digits are allowed",
                raw
            ));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
