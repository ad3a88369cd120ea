use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row, Rows, Statement};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::library::{text_ref, Library, Track, TRACK_SELECT};
use crate::statement;

/// Track fields that can be filtered and sorted on. The declaration order is
/// the order filters appear in the generated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    TrackId,
    Url,
    Track,
    Title,
    ArtistId,
    Artist,
    AlbumId,
    Album,
    Start,
    Duration,
    /// Title, artist and album name run together, for free-text search.
    All,
}

impl Field {
    /// Every field that has an external name, i.e. all but `All`.
    pub const NAMED: [Field; 10] = [
        Field::TrackId,
        Field::Url,
        Field::Track,
        Field::Title,
        Field::ArtistId,
        Field::Artist,
        Field::AlbumId,
        Field::Album,
        Field::Start,
        Field::Duration,
    ];

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Field::TrackId => "trackid",
            Field::Url => "url",
            Field::Track => "track",
            Field::Title => "title",
            Field::ArtistId => "artistid",
            Field::Artist => "artist",
            Field::AlbumId => "albumid",
            Field::Album => "album",
            Field::Start => "start",
            Field::Duration => "duration",
            Field::All => return None,
        })
    }

    fn column(self) -> &'static str {
        match self {
            Field::TrackId => "tracks.id",
            Field::Url => "urls.path",
            Field::Track => "tracks.track",
            Field::Title => "tracks.title",
            Field::ArtistId => "tracks.artist",
            Field::Artist => "artists.name",
            Field::AlbumId => "tracks.album",
            Field::Album => "albums.name",
            Field::Start => "tracks.start",
            Field::Duration => "tracks.duration",
            Field::All => {
                "(COALESCE(tracks.title, '') || COALESCE(artists.name, '') || COALESCE(albums.name, ''))"
            }
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Field> {
        Field::NAMED
            .iter()
            .copied()
            .find(|f| f.name() == Some(s))
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name().unwrap_or("all"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// One `LIKE` condition together with the value bound to its placeholder.
#[derive(Debug, Clone, PartialEq)]
struct Predicate {
    field: Field,
    pattern: Value,
}

impl Predicate {
    fn clause(&self) -> String {
        format!("{} LIKE ? ESCAPE '\\'", self.field.column())
    }
}

/// Wraps `value` for a substring match, escaping the wildcards it contains.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if ch == '%' || ch == '_' || ch == '\\' {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Generated SQL and its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Compiled {
    pub sql: String,
    pub values: Vec<Value>,
}

/// A track search under construction.
///
/// Filters are case-insensitive substring matches and are all required to
/// hold. Sort keys apply in the order they were added. A limit or offset only
/// takes effect when positive.
///
/// ```no_run
/// # use musicd_library::{Field, Library, Query};
/// # fn main() -> musicd_library::Result<()> {
/// let library = Library::open_in_memory()?;
///
/// let mut query = Query::new();
/// query.filter(Field::Artist, "band");
/// query.sort_from_str("album,track")?;
/// query.limit(50);
///
/// let mut statement = query.start(&library)?;
/// let mut tracks = statement.tracks()?;
/// while let Some(track) = tracks.next_track()? {
///     println!("{} {:?}", track.id, track.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: BTreeMap<Field, String>,
    order: Vec<(Field, Direction)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    /// Requires `field` to contain `value`. Replaces an earlier filter on the
    /// same field.
    pub fn filter(&mut self, field: Field, value: &str) -> &mut Query {
        self.filters.insert(field, value.to_string());
        self
    }

    pub fn clear_filter(&mut self, field: Field) -> &mut Query {
        self.filters.remove(&field);
        self
    }

    pub fn sort(&mut self, field: Field, direction: Direction) -> &mut Query {
        self.order.push((field, direction));
        self
    }

    /// Appends sort keys from a comma separated list of field names, each
    /// optionally prefixed with `-` for descending order. Nothing is appended
    /// unless every name is known.
    pub fn sort_from_str(&mut self, sort: &str) -> Result<()> {
        if sort.is_empty() {
            return Ok(());
        }

        let keys = sort
            .split(',')
            .map(|token| -> Result<(Field, Direction)> {
                match token.strip_prefix('-') {
                    Some(name) => Ok((name.parse()?, Direction::Descending)),
                    None => Ok((token.parse()?, Direction::Ascending)),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        self.order.extend(keys);
        Ok(())
    }

    pub fn limit(&mut self, limit: i64) -> &mut Query {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Query {
        self.offset = Some(offset);
        self
    }

    pub fn order(&self) -> &[(Field, Direction)] {
        &self.order
    }

    fn predicates(&self) -> Vec<Predicate> {
        self.filters
            .iter()
            .map(|(&field, value)| Predicate {
                field,
                pattern: Value::Text(like_pattern(value)),
            })
            .collect()
    }

    fn filtered(&self) -> Compiled {
        let mut sql = TRACK_SELECT.to_string();
        let mut values = Vec::new();

        let predicates = self.predicates();
        if !predicates.is_empty() {
            let clauses: Vec<String> = predicates.iter().map(Predicate::clause).collect();
            sql += " WHERE ";
            sql += &clauses.join(" AND ");
            values.extend(predicates.into_iter().map(|p| p.pattern));
        }

        Compiled { sql, values }
    }

    pub(crate) fn compile(&self) -> Compiled {
        let Compiled { mut sql, mut values } = self.filtered();

        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|(field, direction)| {
                    format!("{} COLLATE NOCASE {}", field.column(), direction.keyword())
                })
                .collect();
            sql += " ORDER BY ";
            sql += &keys.join(", ");
        }

        let limit = self.limit.filter(|&l| l > 0);
        let offset = self.offset.filter(|&o| o > 0);
        if limit.is_some() || offset.is_some() {
            sql += " LIMIT ? OFFSET ?";
            values.push(Value::Integer(limit.unwrap_or(-1)));
            values.push(Value::Integer(offset.unwrap_or(0)));
        }

        Compiled { sql, values }
    }

    /// Number of tracks matching the filters, ignoring sort and range.
    pub fn count(&self, library: &Library) -> Result<i64> {
        let Compiled { sql, values } = self.filtered();
        let sql = format!("SELECT COUNT(*) FROM ({})", sql);

        trace!("count '{}' {:?}", sql, values);

        Ok(statement::row(
            library.connection(),
            &sql,
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?
        .unwrap_or(0))
    }

    /// Compiles the query into a prepared, bound statement. The query itself
    /// is consumed.
    pub fn start(self, library: &Library) -> Result<QueryStatement<'_>> {
        let Compiled { sql, values } = self.compile();

        debug!("query '{}' {:?}", sql, values);

        let mut st = statement::prepare(library.connection(), &sql)?;
        for (i, value) in values.iter().enumerate() {
            st.raw_bind_parameter(i + 1, value)?;
        }

        Ok(QueryStatement {
            st,
            sql,
            executed: false,
        })
    }
}

/// A started query. Its rows can be walked once.
pub struct QueryStatement<'c> {
    st: Statement<'c>,
    sql: String,
    executed: bool,
}

impl<'c> QueryStatement<'c> {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn tracks(&mut self) -> Result<QueryTracks<'_>> {
        if self.executed {
            return Err(Error::QueryStarted);
        }
        self.executed = true;

        Ok(QueryTracks {
            rows: self.st.raw_query(),
            sql: &self.sql,
        })
    }
}

/// Forward cursor over the result rows of a [`QueryStatement`].
pub struct QueryTracks<'s> {
    rows: Rows<'s>,
    sql: &'s str,
}

impl<'s> QueryTracks<'s> {
    /// Advances by one row. The returned strings point into the current row
    /// and are only valid until the next call; use [`TrackRef::to_track`] to
    /// keep them.
    pub fn next_track(&mut self) -> Result<Option<TrackRef<'_>>> {
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!("step failed for '{}': {}", self.sql, e);
                return Err(e.into());
            }
        };

        Ok(Some(TrackRef::from_row(row)?))
    }
}

/// A result row borrowed from the statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRef<'r> {
    pub id: i64,
    pub url: i64,
    pub path: &'r str,
    pub track: i64,
    pub title: Option<&'r str>,
    pub artist_id: Option<i64>,
    pub artist: Option<&'r str>,
    pub album_id: Option<i64>,
    pub album: Option<&'r str>,
    pub start: i64,
    pub duration: i64,
}

impl<'r> TrackRef<'r> {
    fn from_row(row: &'r Row) -> rusqlite::Result<TrackRef<'r>> {
        Ok(TrackRef {
            id: row.get(0)?,
            url: row.get(1)?,
            path: text_ref(row, 2)?.unwrap_or(""),
            track: row.get(3)?,
            title: text_ref(row, 4)?,
            artist_id: row.get(5)?,
            artist: text_ref(row, 6)?,
            album_id: row.get(7)?,
            album: text_ref(row, 8)?,
            start: row.get(9)?,
            duration: row.get(10)?,
        })
    }

    pub fn to_track(&self) -> Track {
        Track {
            id: self.id,
            url: self.url,
            path: self.path.to_string(),
            track: self.track,
            title: self.title.map(str::to_string),
            artist_id: self.artist_id,
            artist: self.artist.map(str::to_string),
            album_id: self.album_id,
            album: self.album.map(str::to_string),
            start: self.start,
            duration: self.duration,
        }
    }
}
