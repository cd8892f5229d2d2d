#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    Refreshing,
    Deleting,
}

/// What happened to one candidate package during a sync
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageAction {
    Refreshed,
    Unchanged,
    WouldRefresh,
    Excluded,
    Deleted,
}

impl PackageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageAction::Refreshed => "refreshed",
            PackageAction::Unchanged => "unchanged",
            PackageAction::WouldRefresh => "would refresh",
            PackageAction::Excluded => "excluded",
            PackageAction::Deleted => "deleted",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
        total: usize,
        package: String,
        action: PackageAction,
    },
    Finished {
        phase: ProgressPhase,
    },
}
