//! Service layer modules for external integrations.
//!
//! Contains the wardrobe backend client and the stateful client services
//! built on it: weather caching, location resolution, login session and
//! preference tags.

pub mod api_client;
pub mod location;
pub mod session;
pub mod tags;
pub mod weather_cache;

pub use api_client::WardrobeApi;
pub use location::LocationResolver;
pub use session::SessionStore;
pub use tags::TagCatalog;
pub use weather_cache::{WeatherCache, WeatherLookup};
