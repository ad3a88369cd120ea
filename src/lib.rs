//! Metadata index of the musicd media library: scanned directories and files,
//! the tracks, albums, artists, images and lyrics derived from them, and a
//! query builder for searching tracks.

#[macro_use]
extern crate log;

mod cursor;
mod db_meta;
mod error;
mod library;
mod query;
mod schema;
mod statement;
mod sync;

pub mod config;
pub mod logger;

pub use crate::cursor::{Cursor, Keyed};
pub use crate::error::{Error, Result};
pub use crate::library::{
    Album, Artist, Directory, Image, Library, LibrarySource, Lyrics, NewTrack, Track, Url,
};
pub use crate::query::{Direction, Field, Query, QueryStatement, QueryTracks, TrackRef};
pub use crate::schema::SCHEMA_VERSION;
