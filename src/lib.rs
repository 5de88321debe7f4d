//! Client core of a personal wardrobe: garment intake, location-aware
//! weather caching and outfit-request category selection.

pub mod config;
pub mod domain;
pub mod error;
pub mod intake;
pub mod logging;
pub mod services;
pub mod storage;

pub use error::{WardrobeError, WardrobeResult};
pub use intake::{IntakePipeline, IntakeStage};
