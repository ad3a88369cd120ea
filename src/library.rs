use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::cursor::{Cursor, Keyed};
use crate::db_meta;
use crate::error::{Error, Result};
use crate::schema;
use crate::statement::{execute, row, scalar};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Url {
    pub id: i64,
    pub path: String,
    pub directory: Option<i64>,
    pub mtime: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directory {
    pub id: i64,
    pub path: String,
    pub parent: Option<i64>,
    pub mtime: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub image: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub id: i64,
    pub url: i64,
    pub path: String,
    pub directory: Option<i64>,
    pub album: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lyrics {
    pub track: i64,
    pub lyrics: Option<String>,
    pub mtime: i64,
}

/// A track with every display field resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: i64,
    pub url: i64,
    pub path: String,
    pub track: i64,
    pub title: Option<String>,
    pub artist_id: Option<i64>,
    pub artist: Option<String>,
    pub album_id: Option<i64>,
    pub album: Option<String>,
    pub start: i64,
    pub duration: i64,
}

/// Track metadata as produced by the tag extractor. Artist and album are
/// resolved to shared rows by name on insert.
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub track: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub start: i64,
    pub duration: i64,
}

impl Keyed for Url {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Directory {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Image {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Join used by every full track projection. Column order is fixed, see
/// `Library::track`.
pub(crate) const TRACK_SELECT: &str = "SELECT
    tracks.id,
    tracks.url,
    urls.path,
    tracks.track,
    tracks.title,
    tracks.artist,
    artists.name,
    tracks.album,
    albums.name,
    tracks.start,
    tracks.duration
FROM tracks
JOIN urls ON tracks.url = urls.id
LEFT OUTER JOIN artists ON tracks.artist = artists.id
LEFT OUTER JOIN albums ON tracks.album = albums.id";

const IMAGE_SELECT: &str = "SELECT
    images.id, images.url, urls.path, urls.directory, images.album
FROM images
JOIN urls ON images.url = urls.id";

/// Reads a text column without copying it out of the row.
pub(crate) fn text_ref<'r>(row: &'r Row, idx: usize) -> rusqlite::Result<Option<&'r str>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(Some)
            .map_err(rusqlite::Error::Utf8Error),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            String::new(),
            other.data_type(),
        )),
    }
}

/// Storage session factory. Each worker that needs the library calls `get`
/// and owns the resulting connection.
pub struct LibrarySource {
    db_path: PathBuf,
}

/// One open connection to the library database.
pub struct Library {
    conn: Connection,
}

impl LibrarySource {
    /// Checks or creates the schema. `Ok(None)` means the file holds a schema
    /// version this build can't use.
    pub fn create(db_path: PathBuf) -> Result<Option<LibrarySource>> {
        info!("using '{}'", db_path.to_string_lossy());

        let source = LibrarySource { db_path };

        let mut library = source.get()?;
        if !db_meta::ensure_schema(&mut library.conn, schema::LIBRARY_SCHEMA)? {
            return Ok(None);
        }

        Ok(Some(source))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn get(&self) -> Result<Library> {
        let conn = match Connection::open(&self.db_path) {
            Ok(c) => c,
            Err(e) => {
                error!(
                    "can't open sqlite database '{}': {}",
                    self.db_path.to_string_lossy(),
                    e
                );
                return Err(e.into());
            }
        };

        Library::configure(conn)
    }
}

impl Library {
    /// Opens the database at `path`, creating the schema if the file is new.
    pub fn open(path: &Path) -> Result<Library> {
        match LibrarySource::create(path.to_path_buf())? {
            Some(source) => source.get(),
            None => {
                let library = LibrarySource {
                    db_path: path.to_path_buf(),
                }
                .get()?;
                let version = db_meta::schema_version(&library.conn)?.unwrap_or(0);
                Err(Error::SchemaVersion(version))
            }
        }
    }

    pub fn open_in_memory() -> Result<Library> {
        let mut library = Library::configure(Connection::open_in_memory()?)?;
        db_meta::ensure_schema(&mut library.conn, schema::LIBRARY_SCHEMA)?;
        Ok(library)
    }

    fn configure(conn: Connection) -> Result<Library> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        trace!("journal_mode={}", mode);

        Ok(Library { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns the id of the row whose `lookup` statement matches, inserting it
    /// with `insert` first if there is none. An insert that loses a race with
    /// another writer is ignored by the engine and resolved by looking up again.
    fn id_or_create<F>(&self, lookup: &'static str, value: &str, insert: F) -> Result<i64>
    where
        F: FnOnce(&Connection) -> Result<usize>,
    {
        if let Some(id) = scalar(&self.conn, lookup, params![value])? {
            return Ok(id);
        }

        if insert(&self.conn)? > 0 {
            return Ok(self.conn.last_insert_rowid());
        }

        scalar(&self.conn, lookup, params![value])?
            .ok_or_else(|| Error::Database(rusqlite::Error::QueryReturnedNoRows))
    }

    fn _get_url(row: &Row) -> rusqlite::Result<Url> {
        Ok(Url {
            id: row.get(0)?,
            path: row.get(1)?,
            directory: row.get(2)?,
            mtime: row.get(3)?,
        })
    }

    const URLS_BY_DIRECTORY: &'static str = "SELECT id, path, directory, mtime
        FROM urls
        WHERE directory IS ?1 AND id > ?2
        ORDER BY id LIMIT 1";

    pub(crate) fn url_cursor(&self, directory: Option<i64>) -> Cursor<'_, Url> {
        Cursor::new(&self.conn, Self::URLS_BY_DIRECTORY, directory, Self::_get_url)
    }

    pub fn url(&self, url: i64) -> Result<Option<Url>> {
        trace!("get url url={}", url);

        row(
            &self.conn,
            "SELECT id, path, directory, mtime FROM urls WHERE id = ?",
            params![url],
            Self::_get_url,
        )
    }

    pub fn url_id(&self, path: &str) -> Result<Option<i64>> {
        trace!("get url path='{}'", path);

        scalar(&self.conn, "SELECT id FROM urls WHERE path = ?", params![path])
    }

    pub fn url_id_or_create(&self, path: &str, directory: Option<i64>) -> Result<i64> {
        trace!("get or create url path='{}' directory={:?}", path, directory);

        let id = self.id_or_create("SELECT id FROM urls WHERE path = ?", path, |conn| {
            execute(
                conn,
                "INSERT OR IGNORE INTO urls (path, directory) VALUES (?, ?)",
                params![path, directory],
            )
        })?;

        debug!("url '{}' = {}", path, id);
        Ok(id)
    }

    /// Removes the tracks and images of a url, keeping the url itself.
    pub fn clear_url(&self, url: i64) -> Result<()> {
        trace!("clear url url={}", url);

        execute(&self.conn, "DELETE FROM tracks WHERE url = ?", params![url])?;
        execute(&self.conn, "DELETE FROM images WHERE url = ?", params![url])?;
        Ok(())
    }

    pub fn delete_url(&self, url: i64) -> Result<()> {
        trace!("delete url url={}", url);

        self.clear_url(url)?;
        execute(&self.conn, "DELETE FROM urls WHERE id = ?", params![url])?;
        Ok(())
    }

    pub(crate) fn _get_directory(row: &Row) -> rusqlite::Result<Directory> {
        Ok(Directory {
            id: row.get(0)?,
            path: row.get(1)?,
            parent: row.get(2)?,
            mtime: row.get(3)?,
        })
    }

    pub fn directory(&self, directory: i64) -> Result<Option<Directory>> {
        trace!("get directory directory={}", directory);

        row(
            &self.conn,
            "SELECT id, path, parent, mtime FROM directories WHERE id = ?",
            params![directory],
            Self::_get_directory,
        )
    }

    pub fn directory_id(&self, path: &str) -> Result<Option<i64>> {
        trace!("get directory path='{}'", path);

        scalar(
            &self.conn,
            "SELECT id FROM directories WHERE path = ?",
            params![path],
        )
    }

    pub fn directory_id_or_create(&self, path: &str, parent: Option<i64>) -> Result<i64> {
        trace!("get or create directory path='{}' parent={:?}", path, parent);

        let id = self.id_or_create("SELECT id FROM directories WHERE path = ?", path, |conn| {
            execute(
                conn,
                "INSERT OR IGNORE INTO directories (path, parent) VALUES (?, ?)",
                params![path, parent],
            )
        })?;

        debug!("directory '{}' = {}", path, id);
        Ok(id)
    }

    pub fn artist(&self, artist: i64) -> Result<Option<Artist>> {
        trace!("get artist artist={}", artist);

        row(
            &self.conn,
            "SELECT id, name FROM artists WHERE id = ?",
            params![artist],
            |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
    }

    pub fn artist_id(&self, name: &str) -> Result<Option<i64>> {
        trace!("get artist name='{}'", name);

        scalar(&self.conn, "SELECT id FROM artists WHERE name = ?", params![name])
    }

    pub fn artist_id_or_create(&self, name: &str) -> Result<i64> {
        self.id_or_create("SELECT id FROM artists WHERE name = ?", name, |conn| {
            execute(
                conn,
                "INSERT OR IGNORE INTO artists (name) VALUES (?)",
                params![name],
            )
        })
    }

    pub fn album(&self, album: i64) -> Result<Option<Album>> {
        trace!("get album album={}", album);

        row(
            &self.conn,
            "SELECT id, name, image FROM albums WHERE id = ?",
            params![album],
            |row| {
                Ok(Album {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    image: row.get(2)?,
                })
            },
        )
    }

    pub fn album_id(&self, name: &str) -> Result<Option<i64>> {
        trace!("get album name='{}'", name);

        scalar(&self.conn, "SELECT id FROM albums WHERE name = ?", params![name])
    }

    pub fn album_id_or_create(&self, name: &str) -> Result<i64> {
        self.id_or_create("SELECT id FROM albums WHERE name = ?", name, |conn| {
            execute(
                conn,
                "INSERT OR IGNORE INTO albums (name) VALUES (?)",
                params![name],
            )
        })
    }

    /// Path of the album's cover image, if it has one.
    pub fn album_image_path(&self, album: i64) -> Result<Option<String>> {
        trace!("get album image album={}", album);

        row(
            &self.conn,
            "SELECT urls.path
            FROM albums
            JOIN images ON albums.image = images.id
            JOIN urls ON images.url = urls.id
            WHERE albums.id = ?",
            params![album],
            |row| row.get(0),
        )
    }

    pub fn set_album_image(&self, album: i64, image: i64) -> Result<()> {
        trace!("set album album={} image={}", album, image);

        execute(
            &self.conn,
            "UPDATE albums SET image = ? WHERE id = ?",
            params![image, album],
        )?;
        Ok(())
    }

    fn _get_track(row: &Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: row.get(0)?,
            url: row.get(1)?,
            path: row.get(2)?,
            track: row.get(3)?,
            title: row.get(4)?,
            artist_id: row.get(5)?,
            artist: row.get(6)?,
            album_id: row.get(7)?,
            album: row.get(8)?,
            start: row.get(9)?,
            duration: row.get(10)?,
        })
    }

    pub fn track(&self, track: i64) -> Result<Option<Track>> {
        trace!("get track track={}", track);

        let sql = format!("{} WHERE tracks.id = ?", TRACK_SELECT);
        let result = row(&self.conn, &sql, params![track], Self::_get_track)?;

        if let Some(ref t) = result {
            debug!("{:?}", t);
        }

        Ok(result)
    }

    pub fn random_track_id(&self) -> Result<Option<i64>> {
        scalar(
            &self.conn,
            "SELECT id FROM tracks ORDER BY RANDOM() LIMIT 1",
            [],
        )
    }

    /// Inserts a track owned by `url`, resolving its artist and album names.
    pub fn add_track(&self, url: i64, track: &NewTrack) -> Result<i64> {
        if url <= 0 {
            return Err(Error::MissingUrl);
        }

        let artist = track
            .artist
            .as_deref()
            .map(|name| self.artist_id_or_create(name))
            .transpose()?;
        let album = track
            .album
            .as_deref()
            .map(|name| self.album_id_or_create(name))
            .transpose()?;

        execute(
            &self.conn,
            "INSERT INTO tracks (url, track, title, artist, album, start, duration)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                url,
                track.track,
                track.title,
                artist,
                album,
                track.start,
                track.duration,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("create track {} url={} {:?}", id, url, track);

        Ok(id)
    }

    fn _get_image(row: &Row) -> rusqlite::Result<Image> {
        Ok(Image {
            id: row.get(0)?,
            url: row.get(1)?,
            path: row.get(2)?,
            directory: row.get(3)?,
            album: row.get(4)?,
        })
    }

    const IMAGES_BY_DIRECTORY: &'static str = "SELECT
            images.id, images.url, urls.path, urls.directory, images.album
        FROM images
        JOIN urls ON images.url = urls.id
        WHERE urls.directory IS ?1 AND images.id > ?2
        ORDER BY images.id LIMIT 1";

    const IMAGES_BY_ALBUM: &'static str = "SELECT
            images.id, images.url, urls.path, urls.directory, images.album
        FROM images
        JOIN urls ON images.url = urls.id
        WHERE images.album IS ?1 AND images.id > ?2
        ORDER BY images.id LIMIT 1";

    pub(crate) fn image_cursor_by_directory(&self, directory: Option<i64>) -> Cursor<'_, Image> {
        Cursor::new(&self.conn, Self::IMAGES_BY_DIRECTORY, directory, Self::_get_image)
    }

    pub fn image(&self, image: i64) -> Result<Option<Image>> {
        trace!("get image image={}", image);

        let sql = format!("{} WHERE images.id = ?", IMAGE_SELECT);
        row(&self.conn, &sql, params![image], Self::_get_image)
    }

    pub fn add_image(&self, url: i64) -> Result<i64> {
        if url <= 0 {
            return Err(Error::MissingUrl);
        }

        execute(
            &self.conn,
            "INSERT INTO images (url) VALUES (?)",
            params![url],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("create image {} url={}", id, url);

        Ok(id)
    }

    /// Images associated with `album`, in insertion order.
    pub fn images_by_album(&self, album: i64) -> Cursor<'_, Image> {
        trace!("list images album={}", album);

        Cursor::new(&self.conn, Self::IMAGES_BY_ALBUM, Some(album), Self::_get_image)
    }

    pub fn lyrics(&self, track: i64) -> Result<Option<Lyrics>> {
        trace!("get lyrics track={}", track);

        row(
            &self.conn,
            "SELECT track, lyrics, mtime FROM lyrics WHERE track = ?",
            params![track],
            |row| {
                Ok(Lyrics {
                    track: row.get(0)?,
                    lyrics: row.get(1)?,
                    mtime: row.get(2)?,
                })
            },
        )
    }

    /// Replaces the lyrics of `track`. `None` records that a lookup found
    /// nothing; the stored mtime is the current time either way.
    pub fn set_lyrics(&self, track: i64, lyrics: Option<&str>) -> Result<()> {
        trace!("set lyrics track={}", track);

        execute(
            &self.conn,
            "INSERT OR REPLACE INTO lyrics (track, lyrics, mtime) VALUES (?, ?, ?)",
            params![track, lyrics, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }
}
