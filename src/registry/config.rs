//! Registry configuration

/// How `update_status` treats status changes that leave the queue graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Overwrite unconditionally; callers enforce the graph
    #[default]
    Permissive,
    /// Reject transitions the graph does not allow
    Strict,
}

/// Ticket registry configuration
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Policy for the generic status update path
    pub transition_policy: TransitionPolicy,
}

impl RegistryConfig {
    /// Set the transition policy
    pub fn transition_policy(mut self, policy: TransitionPolicy) -> Self {
        self.transition_policy = policy;
        self
    }

    /// Shorthand for `transition_policy(TransitionPolicy::Strict)`
    pub fn strict(self) -> Self {
        self.transition_policy(TransitionPolicy::Strict)
    }
}
