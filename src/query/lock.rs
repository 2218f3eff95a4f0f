//! Row-level locking for reads.

use sea_query::{LockBehavior, LockType, SelectStatement};

/// How strongly the selected rows are locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

/// What to do when a selected row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Block until the lock is released.
    #[default]
    Wait,
    /// Fail immediately.
    NoWait,
    /// Leave locked rows out of the result.
    SkipLocked,
}

/// A row lock attached to a SELECT.
///
/// ```
/// use repokit::query::LockMode;
///
/// let mode = LockMode::for_update().skip_locked();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockMode {
    pub strength: LockStrength,
    pub wait: WaitPolicy,
}

impl LockMode {
    pub fn for_update() -> Self {
        Self::new(LockStrength::Update)
    }

    pub fn for_no_key_update() -> Self {
        Self::new(LockStrength::NoKeyUpdate)
    }

    pub fn for_share() -> Self {
        Self::new(LockStrength::Share)
    }

    pub fn for_key_share() -> Self {
        Self::new(LockStrength::KeyShare)
    }

    fn new(strength: LockStrength) -> Self {
        Self {
            strength,
            wait: WaitPolicy::Wait,
        }
    }

    pub fn wait(mut self) -> Self {
        self.wait = WaitPolicy::Wait;
        self
    }

    pub fn no_wait(mut self) -> Self {
        self.wait = WaitPolicy::NoWait;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.wait = WaitPolicy::SkipLocked;
        self
    }

    /// Add the locking clause to `query`.
    pub(crate) fn apply(&self, query: &mut SelectStatement) {
        let lock = match self.strength {
            LockStrength::Update => LockType::Update,
            LockStrength::NoKeyUpdate => LockType::NoKeyUpdate,
            LockStrength::Share => LockType::Share,
            LockStrength::KeyShare => LockType::KeyShare,
        };
        match self.wait {
            WaitPolicy::Wait => query.lock(lock),
            WaitPolicy::NoWait => query.lock_with_behavior(lock, LockBehavior::Nowait),
            WaitPolicy::SkipLocked => query.lock_with_behavior(lock, LockBehavior::SkipLocked),
        };
    }
}

/// Options for `get_with` and `list_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub lock: Option<LockMode>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }
}
