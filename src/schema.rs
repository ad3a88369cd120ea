pub const SCHEMA_VERSION: u32 = 1;

pub const META_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value);
";

pub const LIBRARY_SCHEMA: &str = "
CREATE TABLE directories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    parent INTEGER,
    mtime INTEGER,
    FOREIGN KEY(parent) REFERENCES directories(id));

CREATE INDEX directories_parent ON directories (parent);

CREATE TABLE urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    directory INTEGER,
    mtime INTEGER,
    FOREIGN KEY(directory) REFERENCES directories(id));

CREATE INDEX urls_directory ON urls (directory);

CREATE TABLE artists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE);

CREATE TABLE albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    image INTEGER,
    FOREIGN KEY(image) REFERENCES images(id) ON DELETE SET NULL);

CREATE TABLE tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url INTEGER NOT NULL,
    track INTEGER NOT NULL,
    title TEXT,
    artist INTEGER,
    album INTEGER,
    start INTEGER NOT NULL,
    duration INTEGER NOT NULL,
    FOREIGN KEY(url) REFERENCES urls(id),
    FOREIGN KEY(artist) REFERENCES artists(id),
    FOREIGN KEY(album) REFERENCES albums(id));

CREATE INDEX tracks_url ON tracks (url);
CREATE INDEX tracks_artist ON tracks (artist);
CREATE INDEX tracks_album ON tracks (album);

CREATE TABLE images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url INTEGER NOT NULL,
    album INTEGER,
    FOREIGN KEY(url) REFERENCES urls(id),
    FOREIGN KEY(album) REFERENCES albums(id));

CREATE INDEX images_url ON images (url);
CREATE INDEX images_album ON images (album);

CREATE TABLE lyrics (
    track INTEGER PRIMARY KEY,
    lyrics TEXT,
    mtime INTEGER NOT NULL);
";
