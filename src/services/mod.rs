//! External integrations: the beets tagger subprocess and the Navidrome
//! rescan endpoint.

pub mod beets;
pub mod navidrome;
