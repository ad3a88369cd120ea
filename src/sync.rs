//! Directory tree bookkeeping driven by the filesystem scanner.
//!
//! The stored mtimes are checkpoints only: the scanner compares them against
//! what it observes on disk and decides itself whether to re-scan.

use rusqlite::params;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::library::{Directory, Image, Library, Url};
use crate::statement::{execute, scalar};

const DIRECTORIES_BY_PARENT: &str = "SELECT id, path, parent, mtime
    FROM directories
    WHERE parent IS ?1 AND id > ?2
    ORDER BY id LIMIT 1";

impl Library {
    /// Last recorded mtime of a url. `None` if it was never scanned or
    /// doesn't exist.
    pub fn url_mtime(&self, url: i64) -> Result<Option<i64>> {
        trace!("get url mtime url={}", url);

        scalar(
            self.connection(),
            "SELECT mtime FROM urls WHERE id = ?",
            params![url],
        )
    }

    pub fn set_url_mtime(&self, url: i64, mtime: i64) -> Result<()> {
        trace!("set url mtime url={} mtime={}", url, mtime);

        execute(
            self.connection(),
            "UPDATE urls SET mtime = ? WHERE id = ?",
            params![mtime, url],
        )?;
        Ok(())
    }

    pub fn directory_mtime(&self, directory: i64) -> Result<Option<i64>> {
        trace!("get directory mtime directory={}", directory);

        scalar(
            self.connection(),
            "SELECT mtime FROM directories WHERE id = ?",
            params![directory],
        )
    }

    pub fn set_directory_mtime(&self, directory: i64, mtime: i64) -> Result<()> {
        trace!("set directory mtime directory={} mtime={}", directory, mtime);

        execute(
            self.connection(),
            "UPDATE directories SET mtime = ? WHERE id = ?",
            params![mtime, directory],
        )?;
        Ok(())
    }

    /// Urls directly under `directory`, or the top-level urls for `None`.
    pub fn urls_by_directory(&self, directory: Option<i64>) -> Cursor<'_, Url> {
        trace!("list urls directory={:?}", directory);

        self.url_cursor(directory)
    }

    /// Child directories of `parent`, or the roots for `None`.
    pub fn directories_by_parent(&self, parent: Option<i64>) -> Cursor<'_, Directory> {
        trace!("list directories parent={:?}", parent);

        Cursor::new(
            self.connection(),
            DIRECTORIES_BY_PARENT,
            parent,
            Library::_get_directory,
        )
    }

    /// Images owned by the urls directly under `directory`.
    pub fn images_by_directory(&self, directory: i64) -> Cursor<'_, Image> {
        trace!("list images directory={}", directory);

        self.image_cursor_by_directory(Some(directory))
    }

    /// Number of tracks owned by the urls directly under `directory`.
    pub fn directory_track_count(&self, directory: i64) -> Result<i64> {
        trace!("count tracks directory={}", directory);

        Ok(scalar(
            self.connection(),
            "SELECT COUNT(tracks.id)
            FROM urls
            JOIN tracks ON tracks.url = urls.id
            WHERE urls.directory = ?",
            params![directory],
        )?
        .unwrap_or(0))
    }

    /// The album most tracks directly under `directory` belong to. Equal
    /// counts go to the lowest album id.
    pub fn album_by_directory(&self, directory: i64) -> Result<Option<i64>> {
        trace!("get dominant album directory={}", directory);

        scalar(
            self.connection(),
            "SELECT tracks.album
            FROM urls
            JOIN tracks ON tracks.url = urls.id
            WHERE urls.directory = ? AND tracks.album IS NOT NULL
            GROUP BY tracks.album
            ORDER BY COUNT(tracks.id) DESC, tracks.album ASC
            LIMIT 1",
            params![directory],
        )
    }

    /// Associates every image under `directory` with `album`.
    pub fn set_image_album_by_directory(&self, directory: i64, album: i64) -> Result<()> {
        trace!(
            "set image album directory={} album={}",
            directory,
            album
        );

        execute(
            self.connection(),
            "UPDATE images SET album = ? WHERE url IN (SELECT id FROM urls WHERE directory = ?)",
            params![album, directory],
        )?;
        Ok(())
    }

    /// Deletes a directory along with its urls and, recursively, its child
    /// directories. Children go first so no row ever points at a deleted
    /// parent. The parent chain must be acyclic.
    pub fn delete_directory(&self, directory: i64) -> Result<()> {
        trace!("delete directory directory={}", directory);

        for url in self.urls_by_directory(Some(directory)) {
            self.delete_url(url?.id)?;
        }

        for child in self.directories_by_parent(Some(directory)) {
            self.delete_directory(child?.id)?;
        }

        execute(
            self.connection(),
            "DELETE FROM directories WHERE id = ?",
            params![directory],
        )?;

        debug!("deleted directory {}", directory);
        Ok(())
    }
}
