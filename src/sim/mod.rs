//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - One seeded RNG per level, drawn in program order
//! - Stable iteration order (arena slot order, registry insertion order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod companion;
pub mod damage;
pub mod entity;
pub mod layout;
pub mod physics;
pub mod registry;
pub mod rng;
pub mod state;
pub mod tick;

pub use collision::{ContactClass, ContactHandler, Dispatch, Reaction, classify, dispatch};
pub use companion::{CompanionHooks, HealthBar, HealthBars};
pub use damage::{DamageOutcome, FragmentPlan, plan_fragments};
pub use entity::{Body, Entity, EntityId, Health, Kind, KindTag, Life, Loadout, Prefab, Spawn};
pub use layout::{Layout, layout_for};
pub use physics::{BasicPhysics, BodyMut, Contact, PhysicsStep};
pub use registry::{Arena, Registry};
pub use rng::SimRng;
pub use state::{Collaborators, Level, Mode, Transition};
pub use tick::{FixedClock, TickOutcome};
