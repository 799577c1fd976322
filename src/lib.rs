//! Reservation planning core for a television recording appliance.
//!
//! Given the broadcast catalogue, the user's matching rules, the manually
//! requested reservations and the tuner inventory, the planner derives the
//! authoritative schedule: programs that will be recorded, programs no
//! tuner can host (conflicts), and programs the user asked to omit
//! (skips). The schedule is persisted to a single JSON document so it
//! survives restart, and is re-derived whenever input facts change.
//!
//! # Components
//!
//! - [`planner::Planner`]: the public mutation/query surface, guarded by a
//!   single-writer discipline
//! - [`resolver`]: sweep-line tuner allocation producing the tri-partition
//! - [`store::ReservationStore`]: ordered reservation list with atomic
//!   persistence
//! - [`rule`]: projection of rule records into catalogue queries
//! - [`collaborators`]: traits for the catalogue, the rule store and the
//!   IPC bus, implemented by the embedding process
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use reserve_planner::{
//!     ChannelType, CollabError, ObserverNotifier, Planner, Program, ProgramCatalogue,
//!     ProgramId, Rule, RuleId, RuleStore, SearchOption, TunerDevice,
//! };
//!
//! struct Catalogue;
//!
//! #[async_trait]
//! impl ProgramCatalogue for Catalogue {
//!     async fn find_by_id(
//!         &self,
//!         _id: ProgramId,
//!         _with_extended: bool,
//!     ) -> Result<Vec<Program>, CollabError> {
//!         Ok(Vec::new())
//!     }
//!
//!     async fn find_by_rule(&self, _option: &SearchOption) -> Result<Vec<Program>, CollabError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! struct Rules;
//!
//! #[async_trait]
//! impl RuleStore for Rules {
//!     async fn find_all(&self) -> Result<Vec<Rule>, CollabError> {
//!         Ok(Vec::new())
//!     }
//!
//!     async fn find_by_id(&self, _id: RuleId) -> Result<Vec<Rule>, CollabError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! struct Bus;
//!
//! #[async_trait]
//! impl ObserverNotifier for Bus {
//!     async fn notify_observers(&self) {}
//! }
//!
//! # async fn run() -> reserve_planner::Result<()> {
//! let planner = Arc::new(Planner::new(
//!     Arc::new(Catalogue),
//!     Arc::new(Rules),
//!     Arc::new(Bus),
//!     reserve_planner::store::DEFAULT_RESERVES_PATH,
//! )?);
//! planner
//!     .set_tuners(vec![TunerDevice {
//!         index: 0,
//!         types: vec![ChannelType::GR, ChannelType::BS],
//!     }])
//!     .await?;
//! planner.update_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod error;
pub mod planner;
pub mod resolver;
pub mod rule;
pub mod store;
pub mod tuner;
pub mod types;

pub use collaborators::{CollabError, ObserverNotifier, ProgramCatalogue, RuleStore};
pub use error::{PlannerError, Result};
pub use planner::Planner;
pub use types::{
    ChannelType, EncodeOption, Program, ProgramId, Reservation, Rule, RuleId, RuleOption,
    SearchOption, TunerDevice,
};
