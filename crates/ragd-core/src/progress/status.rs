/// Processing state of a document, as stored in its `run` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// Parsing not started.
    Unstart,
    /// Parsing in progress.
    Running,
    /// Parsing cancelled by the user.
    Cancel,
    /// All tasks finished.
    Done,
    /// At least one task failed.
    Fail,
}

impl RunStatus {
    /// Convert to string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstart => "0",
            Self::Running => "1",
            Self::Cancel => "2",
            Self::Done => "3",
            Self::Fail => "4",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "0" => Some(Self::Unstart),
            "1" => Some(Self::Running),
            "2" => Some(Self::Cancel),
            "3" => Some(Self::Done),
            "4" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
