//! Trainer lifecycle phases

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Validating,
    Checkpointing,
    Done,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Running => "RUNNING",
            Phase::Validating => "VALIDATING",
            Phase::Checkpointing => "CHECKPOINTING",
            Phase::Done => "DONE",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Init, Running)
                | (Init, Done)
                | (Running, Validating)
                | (Running, Checkpointing)
                | (Running, Done)
                | (Validating, Running)
                | (Validating, Checkpointing)
                | (Checkpointing, Running)
                | (Checkpointing, Done)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_is_terminal() {
        for next in [Phase::Init, Phase::Running, Phase::Validating, Phase::Checkpointing, Phase::Done] {
            assert!(!Phase::Done.can_transition(next));
        }
    }

    #[test]
    fn test_running_cycle() {
        assert!(Phase::Init.can_transition(Phase::Running));
        assert!(Phase::Running.can_transition(Phase::Validating));
        assert!(Phase::Validating.can_transition(Phase::Checkpointing));
        assert!(Phase::Checkpointing.can_transition(Phase::Running));
        assert!(!Phase::Validating.can_transition(Phase::Init));
        assert_eq!(Phase::Checkpointing.to_string(), "CHECKPOINTING");
    }
}
