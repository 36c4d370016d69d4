pub mod gateway;
pub mod handlers;
pub mod page;
pub mod prompt;
pub mod tracker;

// Re-export main components
pub use gateway::RegionGateway;
pub use tracker::RequestTracker;
