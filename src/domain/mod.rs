//! Domain types and DTOs
//!
//! Wire types exchanged with the wardrobe backend plus the client-side
//! models built from them.

pub mod auth;
pub mod catalog;
pub mod categories;
pub mod garment;
pub mod location;
pub mod profile;
pub mod recommend;
pub mod segment;
pub mod tags;
pub mod weather;

mod serde_helpers;

// Re-export commonly used types
pub use categories::TargetCategorySet;
pub use garment::{DraftPatch, GarmentDraft, GarmentRecord, VirtualItemRequest};
pub use location::{Coordinates, LocationKey, LocationSource, ResolvedLocation};
pub use segment::{SegmentCandidate, SourceImage};
pub use weather::WeatherSnapshot;
