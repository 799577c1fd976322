//! Consumed capabilities: the external systems the planner plans against.
//!
//! The program catalogue, the rule database and the IPC bus are
//! collaborators, not part of this crate; the planner reaches them through
//! these traits and the embedding process supplies the implementations.

use async_trait::async_trait;

use crate::types::{Program, ProgramId, Rule, RuleId, SearchOption};

/// Boxed error for collaborator failures. The planner logs these and
/// degrades; it never inspects them beyond their display form.
pub type CollabError = Box<dyn std::error::Error + Send + Sync>;

/// Read access to the broadcast program catalogue.
#[async_trait]
pub trait ProgramCatalogue: Send + Sync {
    /// Look up one program by id. Returns zero or one element in practice.
    async fn find_by_id(
        &self,
        id: ProgramId,
        with_extended: bool,
    ) -> Result<Vec<Program>, CollabError>;

    /// Return every program matching the search option.
    async fn find_by_rule(&self, option: &SearchOption) -> Result<Vec<Program>, CollabError>;
}

/// Read access to the user-defined rule store.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Rule>, CollabError>;

    /// Look up one rule by id. Returns zero or one element in practice.
    async fn find_by_id(&self, id: RuleId) -> Result<Vec<Rule>, CollabError>;
}

/// Outbound notification bus.
///
/// Fire-and-forget: the planner emits one signal per successful re-plan,
/// carries no payload and never waits on delivery.
#[async_trait]
pub trait ObserverNotifier: Send + Sync {
    async fn notify_observers(&self);
}
