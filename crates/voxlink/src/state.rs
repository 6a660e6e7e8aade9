//! Playback state of a synthesis proxy

/// Playback state of one proxy instance. Exactly one utterance may be
/// current at a time; the proxy keeps no history of past utterances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    Idle,
    Speaking,
    Paused,
}

impl SynthesisState {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Legal moves: Idle → Speaking, Speaking ↔ Paused, and
    /// Speaking/Paused → Idle (finish or cancel).
    pub fn can_become(self, next: SynthesisState) -> bool {
        use SynthesisState::*;
        matches!(
            (self, next),
            (Idle, Speaking)
                | (Speaking, Paused)
                | (Paused, Speaking)
                | (Speaking, Idle)
                | (Paused, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SynthesisState::*;

    #[test]
    fn legal_transitions() {
        assert!(Idle.can_become(Speaking));
        assert!(Speaking.can_become(Paused));
        assert!(Paused.can_become(Speaking));
        assert!(Speaking.can_become(Idle));
        assert!(Paused.can_become(Idle));
    }

    #[test]
    fn illegal_transitions() {
        assert!(!Idle.can_become(Paused));
        assert!(!Idle.can_become(Idle));
        assert!(!Paused.can_become(Paused));
        assert!(!Speaking.can_become(Speaking));
    }
}
