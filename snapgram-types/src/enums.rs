use serde::{Deserialize, Serialize};

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Liked,
    Unliked,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Liked => "liked",
            LikeAction::Unliked => "unliked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_action_wire_format() {
        assert_eq!(serde_json::to_string(&LikeAction::Liked).unwrap(), "\"liked\"");
        assert_eq!(serde_json::to_string(&LikeAction::Unliked).unwrap(), "\"unliked\"");
    }

    #[test]
    fn test_like_action_as_str_matches_wire_format() {
        for action in [LikeAction::Liked, LikeAction::Unliked] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }
}
