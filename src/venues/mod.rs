// Venues module - collaborator traits, venue registry, and paper execution

pub mod adapter;
pub mod paper;
pub mod registry;

pub use adapter::{
    Address, LiquiditySource, SwapRequest, Token, VenueCandidate, VenueExecutor, VenueId,
};
pub use paper::PaperVenue;
pub use registry::VenueRegistry;
