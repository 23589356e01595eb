use super::error::SessionError;

/// Session phase machine.
///
/// ```text
/// idle → validating → capturing → assembling → completed
///            ↓            ↓            ↓
///          failed ←───────┴────────────┘ (fatal errors only)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Validating,
    Capturing { attempt: u64, total: u64 },
    Assembling { frames: usize },
    Completed,
    Failed(SessionError),
}

impl SessionPhase {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Capturing { .. } => "capturing",
            Self::Assembling { .. } => "assembling",
            Self::Completed => "completed",
            Self::Failed(_) => "failed",
        }
    }
}
