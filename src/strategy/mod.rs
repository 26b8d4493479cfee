//! Adaptive image URI resolution.
//!
//! A page's image can usually be fetched several ways: through its image
//! service, by its raw identifier, or by treating the identifier as an Image
//! API base. Servers support different subsets of these, so the engine walks
//! an ordered menu of [`Tier`]s and stops at the first that works.
//!
//! Failures on the first page of a manifest switch the failing tiers off in
//! the manifest's [`StrategyState`], assuming the rest of the document is
//! served the same way. Later pages never re-enable a tier.

mod engine;
mod tier;

pub use engine::{PageRequest, Resolution, resolve_page};
pub use tier::{StrategyState, Tier};
