use musicd_library::{Direction, Field, Library, NewTrack, Query};

fn count(library: &Library, table: &str) -> i64 {
    library
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
}

fn collect(library: &Library, query: Query) -> Vec<i64> {
    let mut statement = query.start(library).unwrap();
    let mut tracks = statement.tracks().unwrap();
    let mut ids = Vec::new();
    while let Some(track) = tracks.next_track().unwrap() {
        ids.push(track.id);
    }
    ids
}

#[test]
fn new_file_indexed() {
    let library = Library::open_in_memory().unwrap();

    let dir = library.directory_id_or_create("/music", None).unwrap();
    let url = library.url_id_or_create("/music/a.flac", Some(dir)).unwrap();
    let track = library
        .add_track(
            url,
            &NewTrack {
                track: 1,
                title: Some("Song".to_string()),
                artist: Some("Band".to_string()),
                album: Some("LP".to_string()),
                start: 0,
                duration: 180,
            },
        )
        .unwrap();

    let loaded = library.track(track).unwrap().unwrap();
    assert_eq!(loaded.artist.as_deref(), Some("Band"));
    assert_eq!(loaded.album.as_deref(), Some("LP"));
    assert_eq!(loaded.title.as_deref(), Some("Song"));
    assert_eq!(loaded.path, "/music/a.flac");
    assert_eq!(loaded.duration, 180);
    assert_eq!(library.directory_track_count(dir).unwrap(), 1);
    assert_eq!(library.random_track_id().unwrap(), Some(track));
}

#[test]
fn rescan_checkpoint() {
    let library = Library::open_in_memory().unwrap();
    let dir = library.directory_id_or_create("/music", None).unwrap();
    let url = library.url_id_or_create("/music/a.flac", Some(dir)).unwrap();

    library.set_url_mtime(url, 1000).unwrap();

    assert_eq!(library.url_mtime(url).unwrap(), Some(1000));
    // Resolving the same path again must not reset the checkpoint.
    assert_eq!(library.url_id_or_create("/music/a.flac", Some(dir)).unwrap(), url);
    assert_eq!(library.url_mtime(url).unwrap(), Some(1000));
}

#[test]
fn unknown_sort_field_rejected() {
    let mut query = Query::new();

    assert!(query.sort_from_str("bogusfield").is_err());
    assert!(query.order().is_empty());
}

#[test]
fn rescan_replaces_tracks_of_changed_file() {
    let library = Library::open_in_memory().unwrap();
    let dir = library.directory_id_or_create("/music", None).unwrap();
    let url = library.url_id_or_create("/music/album.cue", Some(dir)).unwrap();

    for i in 1..=3 {
        library
            .add_track(
                url,
                &NewTrack {
                    track: i,
                    title: Some(format!("Part {}", i)),
                    artist: Some("Band".to_string()),
                    album: Some("Live".to_string()),
                    start: (i - 1) * 600,
                    duration: 600,
                },
            )
            .unwrap();
    }
    library.set_url_mtime(url, 1).unwrap();
    assert_eq!(library.directory_track_count(dir).unwrap(), 3);

    // The file changed on disk: the scanner clears it and extracts again.
    library.clear_url(url).unwrap();
    library
        .add_track(
            url,
            &NewTrack {
                track: 1,
                title: Some("Whole".to_string()),
                artist: Some("Band".to_string()),
                album: Some("Live".to_string()),
                start: 0,
                duration: 1800,
            },
        )
        .unwrap();
    library.set_url_mtime(url, 2).unwrap();

    assert_eq!(library.directory_track_count(dir).unwrap(), 1);
    assert_eq!(count(&library, "artists"), 1);
    assert_eq!(count(&library, "albums"), 1);
    assert_eq!(library.url_mtime(url).unwrap(), Some(2));
}

#[test]
fn directory_cover_assignment() {
    let library = Library::open_in_memory().unwrap();
    let dir = library.directory_id_or_create("/music/lp", None).unwrap();
    let song = library.url_id_or_create("/music/lp/1.flac", Some(dir)).unwrap();
    let cover = library.url_id_or_create("/music/lp/cover.jpg", Some(dir)).unwrap();

    library
        .add_track(
            song,
            &NewTrack {
                album: Some("LP".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    let image = library.add_image(cover).unwrap();

    let album = library.album_by_directory(dir).unwrap().unwrap();
    library.set_image_album_by_directory(dir, album).unwrap();
    library.set_album_image(album, image).unwrap();

    assert_eq!(
        library.album_image_path(album).unwrap().as_deref(),
        Some("/music/lp/cover.jpg")
    );
    let images: Vec<i64> = library
        .images_by_album(album)
        .map(|i| i.unwrap().id)
        .collect();
    assert_eq!(images, vec![image]);
}

#[test]
fn removed_tree_leaves_nothing_behind() {
    let library = Library::open_in_memory().unwrap();
    let root = library.directory_id_or_create("/music", None).unwrap();
    let mut parent = root;
    for depth in 0..4 {
        let dir = library
            .directory_id_or_create(&format!("/music/{}", depth), Some(parent))
            .unwrap();
        for file in 0..3 {
            let url = library
                .url_id_or_create(&format!("/music/{}/{}.flac", depth, file), Some(dir))
                .unwrap();
            library
                .add_track(
                    url,
                    &NewTrack {
                        artist: Some("Band".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            library.add_image(url).unwrap();
        }
        parent = dir;
    }

    library.delete_directory(root).unwrap();

    for table in ["directories", "urls", "tracks", "images"].iter() {
        assert_eq!(count(&library, table), 0, "{} not empty", table);
    }
    assert_eq!(count(&library, "artists"), 1);
}

#[test]
fn search_then_page() {
    let library = Library::open_in_memory().unwrap();
    let url = library.url_id_or_create("/mix.cue", None).unwrap();
    for i in 0..7 {
        library
            .add_track(
                url,
                &NewTrack {
                    track: i,
                    title: Some(format!("Track {}", i)),
                    artist: Some(if i % 2 == 0 { "Even" } else { "Odd" }.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let mut query = Query::new();
    query
        .filter(Field::Artist, "even")
        .sort(Field::Track, Direction::Descending);
    assert_eq!(query.count(&library).unwrap(), 4);

    let all = collect(&library, query.clone());
    let mut first = query.clone();
    first.limit(3);
    let mut second = query.clone();
    second.limit(3).offset(3);

    let mut paged = collect(&library, first);
    paged.extend(collect(&library, second));
    assert_eq!(paged, all);
    assert_eq!(all.len(), 4);
}
