//! Viewpoint presence tracking
//!
//! Resolves which entities contain the viewpoint, keeps the layered
//! zone stack current, and delivers enter/leave transitions to the
//! event listeners and the script host.

pub mod tracker;

pub use tracker::PresenceTracker;
