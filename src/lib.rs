//! Personal note library built around memory retention.
//!
//! Notes live in a [`NoteStore`]; on top of it sit a freshness decay model,
//! an SM-2 review scheduler and the selection strategies that decide which
//! notes to bring back: resurfacing, "on this day", serendipity and search.

mod cli;
mod config;
mod errors;
mod freshness;
mod helper;
mod memory_store;
mod note;
mod on_this_day;
mod resurface;
mod review;
mod search;
mod serendipity;
mod storage;
mod transfer;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use freshness::*;
pub use helper::*;
pub use memory_store::*;
pub use note::*;
pub use on_this_day::*;
pub use resurface::*;
pub use review::*;
pub use search::*;
pub use serendipity::*;
pub use storage::*;
pub use transfer::*;
pub use types::*;
