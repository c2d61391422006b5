use serde::{Deserialize, Serialize};

/// Three-state boolean for optional attributes.
///
/// An attribute that was absent in the source must stay absent after a
/// round trip; collapsing it to `false` would make the reconstructor emit
/// `attr="false"` where the original had nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TriState {
    #[default]
    Absent,
    False,
    True,
}

impl TriState {
    /// Parse an optional attribute value. Unrecognized strings count as absent.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("true") | Some("1") => TriState::True,
            Some("false") | Some("0") => TriState::False,
            _ => TriState::Absent,
        }
    }

    /// Attribute text to emit during reconstruction, or `None` to omit it.
    pub fn emit(self) -> Option<&'static str> {
        match self {
            TriState::Absent => None,
            TriState::False => Some("false"),
            TriState::True => Some("true"),
        }
    }

    pub fn is_absent(self) -> bool {
        self == TriState::Absent
    }

    pub fn to_option(self) -> Option<bool> {
        match self {
            TriState::Absent => None,
            TriState::False => Some(false),
            TriState::True => Some(true),
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(v: Option<bool>) -> Self {
        match v {
            None => TriState::Absent,
            Some(false) => TriState::False,
            Some(true) => TriState::True,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_absent() {
        assert_eq!(TriState::parse(None), TriState::Absent);
        assert_eq!(TriState::parse(Some("yes")), TriState::Absent);
    }

    #[test]
    fn parse_explicit() {
        assert_eq!(TriState::parse(Some("true")), TriState::True);
        assert_eq!(TriState::parse(Some("false")), TriState::False);
        assert_eq!(TriState::parse(Some("1")), TriState::True);
        assert_eq!(TriState::parse(Some("0")), TriState::False);
    }

    #[test]
    fn emit_matches_state() {
        assert_eq!(TriState::Absent.emit(), None);
        assert_eq!(TriState::False.emit(), Some("false"));
        assert_eq!(TriState::True.emit(), Some("true"));
    }

    #[test]
    fn option_round_trip() {
        for v in [None, Some(false), Some(true)] {
            assert_eq!(TriState::from(v).to_option(), v);
        }
    }
}
