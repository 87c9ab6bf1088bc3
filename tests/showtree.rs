use showtree::{
    ConjoinConfig, Episode, EpisodeDescriptor, MetadataProvider, MetadataRetrievalError,
    ProgressEvent, Season, SeasonDescriptor, Show, ShowDescriptor, ShowError, ShowtreeError,
    conjoin_library,
};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

struct FakeCatalog {
    shows: HashMap<String, Show>,
    queries: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn new(shows: Vec<Show>) -> Self {
        Self {
            shows: shows.into_iter().map(|s| (s.name.clone(), s)).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<String> {
        let mut queries = self.queries.lock().unwrap().clone();
        queries.sort();
        queries
    }
}

impl MetadataProvider for FakeCatalog {
    fn fetch_show(&self, query: &str) -> Result<Show, MetadataRetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.shows
            .get(query)
            .cloned()
            .ok_or_else(|| MetadataRetrievalError::SeriesNotFound(query.to_string()))
    }
}

fn episode(season: usize, number: usize, name: &str) -> Episode {
    Episode {
        season_number: season,
        episode_number: number,
        name: name.to_string(),
        summary: format!("{} happens.", name),
        image: None,
    }
}

fn show(id: u64, name: &str, seasons: Vec<(usize, Vec<&str>)>) -> Show {
    Show {
        id,
        name: name.to_string(),
        summary: format!("All about {}.", name),
        image: None,
        seasons: seasons
            .into_iter()
            .map(|(number, titles)| Season {
                season_number: number,
                episodes: titles
                    .into_iter()
                    .enumerate()
                    .map(|(i, title)| episode(number, i + 1, title))
                    .collect(),
            })
            .collect(),
    }
}

fn catalog() -> FakeCatalog {
    FakeCatalog::new(vec![
        show(
            1,
            "Show One",
            vec![
                (
                    1,
                    vec!["Pilot", "An Unreasonably Long Title That Matches Nothing At All"],
                ),
                (2, vec!["Return"]),
                (3, vec!["Finale"]),
            ],
        ),
        show(2, "Show Two", vec![(1, vec!["Beginning"])]),
    ])
}

/// A media root with a canonical path, as `ConjoinConfig` resolves it
fn media_root() -> (TempDir, PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("media");
    fs::create_dir(&root).unwrap();
    let root = root.canonicalize().unwrap();
    (temp, root)
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(path).unwrap();
}

fn read<T: serde::de::DeserializeOwned>(root: &Path, relative: &str) -> T {
    let content = fs::read_to_string(root.join(relative)).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Every `.json` file below `root` with its content
fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

fn standard_library(root: &Path) {
    touch(&root.join("Show One (US)").join("1").join("Show One s01e01.mp4"));
    touch(&root.join("Show One (US)").join("1").join("notes.txt"));
    fs::create_dir_all(root.join("Show One (US)").join("2")).unwrap();
    touch(&root.join("Show Two").join("1").join("Beginning.mkv"));
    fs::create_dir_all(root.join("Unknown Show").join("1")).unwrap();
    touch(&root.join("README.txt"));
}

fn config(root: &Path) -> ConjoinConfig {
    ConjoinConfig::new(root)
        .unwrap()
        .with_strip_suffixes(vec![" (US)".to_string()])
}

#[test]
fn test_writes_cross_linked_tree() {
    let (_temp, root) = media_root();
    standard_library(&root);
    let catalog = catalog();

    let report = conjoin_library(&config(&root), &catalog, |_| {}).unwrap();
    assert_eq!(report.shows.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(catalog.queries(), vec!["Show One", "Show Two", "Unknown Show"]);

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert_eq!(shows, report.shows);
    assert_eq!(shows[0].title, "Show One");
    assert_eq!(shows[0].url, "Show One (US).json");
    assert_eq!(shows[0].seasons_url, "Show One (US)/seasons.json");
    assert_eq!(shows[1].url, "Show Two.json");

    let single: ShowDescriptor = read(&root, &shows[0].url);
    assert_eq!(single, shows[0]);

    // season 3 has no directory
    let seasons: Vec<SeasonDescriptor> = read(&root, &shows[0].seasons_url);
    let numbers: Vec<usize> = seasons.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert!(!root.join("Show One (US)").join("3.json").exists());

    for season in &seasons {
        let single: SeasonDescriptor = read(&root, &season.url);
        assert_eq!(&single, season);
    }

    let episodes: Vec<EpisodeDescriptor> = read(&root, &seasons[0].episodes_url);
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].url, "Show One (US)/1/Pilot.json");
    assert_eq!(
        episodes[0].video_url.as_deref(),
        Some("Show One (US)/1/Show One s01e01.mp4")
    );
    assert_eq!(episodes[1].video_url, None);
    for episode in &episodes {
        let single: EpisodeDescriptor = read(&root, &episode.url);
        assert_eq!(&single, episode);
    }

    let returning: Vec<EpisodeDescriptor> = read(&root, &seasons[1].episodes_url);
    assert_eq!(returning.len(), 1);
    assert_eq!(returning[0].video_url, None);

    let beginning: Vec<EpisodeDescriptor> = read(&root, "Show Two/1/episodes.json");
    assert_eq!(
        beginning[0].video_url.as_deref(),
        Some("Show Two/1/Beginning.mkv")
    );
}

#[test]
fn test_unresolved_show_is_excluded() {
    let (_temp, root) = media_root();
    standard_library(&root);

    let report = conjoin_library(&config(&root), &catalog(), |_| {}).unwrap();

    let failure = &report.failures[0];
    assert_eq!(failure.directory, root.join("Unknown Show"));
    assert!(matches!(
        failure.error,
        ShowError::Lookup(MetadataRetrievalError::SeriesNotFound(_))
    ));
    assert!(!root.join("Unknown Show.json").exists());
    assert!(!root.join("Unknown Show").join("seasons.json").exists());

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert!(shows.iter().all(|s| s.url != "Unknown Show.json"));
}

#[test]
fn test_tree_inconsistency_only_affects_its_show() {
    let (_temp, root) = media_root();
    standard_library(&root);
    fs::create_dir_all(root.join("Show Two").join("Extras")).unwrap();

    let report = conjoin_library(&config(&root), &catalog(), |_| {}).unwrap();

    let failed: Vec<&Path> = report
        .failures
        .iter()
        .map(|f| f.directory.as_path())
        .collect();
    assert_eq!(
        failed,
        vec![root.join("Show Two").as_path(), root.join("Unknown Show").as_path()]
    );
    assert!(matches!(
        report.failures[0].error,
        ShowError::Walk(ref e) if e.is_tree_inconsistency()
    ));

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0].title, "Show One");
    assert!(!root.join("Show Two.json").exists());
}

#[test]
fn test_rerun_produces_identical_tree() {
    let (_temp, root) = media_root();
    standard_library(&root);
    let config = config(&root);

    conjoin_library(&config, &catalog(), |_| {}).unwrap();
    let first = snapshot(&root);
    conjoin_library(&config.clone().with_jobs(Some(1)), &catalog(), |_| {}).unwrap();
    let second = snapshot(&root);

    assert!(first.contains_key(Path::new("shows.json")));
    assert_eq!(first, second);

    // nothing but descriptors and the original files
    let stray: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".tmp"))
        })
        .collect();
    assert!(stray.is_empty(), "staging files left behind: {:?}", stray);
}

#[test]
fn test_document_root_prefixes_every_url() {
    let (_temp, root) = media_root();
    standard_library(&root);
    let config = config(&root).with_document_root("/library/");

    conjoin_library(&config, &catalog(), |_| {}).unwrap();

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert_eq!(shows[0].url, "/library/Show One (US).json");
    assert_eq!(shows[0].seasons_url, "/library/Show One (US)/seasons.json");

    let episodes: Vec<EpisodeDescriptor> = read(&root, "Show One (US)/1/episodes.json");
    assert_eq!(episodes[0].url, "/library/Show One (US)/1/Pilot.json");
    assert_eq!(
        episodes[0].video_url.as_deref(),
        Some("/library/Show One (US)/1/Show One s01e01.mp4")
    );
}

#[test]
fn test_progress_events() {
    let (_temp, root) = media_root();
    standard_library(&root);
    let events = Mutex::new(Vec::new());

    conjoin_library(&config(&root), &catalog(), |event| {
        events.lock().unwrap().push(event);
    })
    .unwrap();

    let events = events.into_inner().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::Started { .. })));
    assert!(matches!(
        events[1],
        ProgressEvent::ShowsDiscovered { count: 3 }
    ));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Complete {
            written: 2,
            failed: 1
        })
    ));

    let written = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ShowWritten { .. }))
        .count();
    assert_eq!(written, 2);

    let failed: Vec<&PathBuf> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::ShowFailed { directory, .. } => Some(directory),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![&root.join("Unknown Show")]);
}

#[test]
fn test_empty_root_writes_empty_index() {
    let (_temp, root) = media_root();

    let report = conjoin_library(&config(&root), &catalog(), |_| {}).unwrap();
    assert!(report.shows.is_empty());

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert!(shows.is_empty());
}

#[test]
fn test_vanished_root_fails_the_run() {
    let (_temp, root) = media_root();
    let config = config(&root);
    fs::remove_dir(&root).unwrap();

    let result = conjoin_library(&config, &catalog(), |_| {});
    assert!(matches!(result, Err(ShowtreeError::ReadRoot { .. })));
}

#[test]
fn test_show_directory_named_like_show_list_is_excluded() {
    let (_temp, root) = media_root();
    standard_library(&root);
    fs::create_dir_all(root.join("shows").join("1")).unwrap();
    let catalog = FakeCatalog::new(vec![show(3, "shows", vec![(1, vec!["Opening"])])]);

    let report = conjoin_library(&config(&root), &catalog, |_| {}).unwrap();

    assert!(
        report
            .failures
            .iter()
            .any(|f| matches!(f.error, ShowError::ReservedName(ref d) if d == &root.join("shows")))
    );
    // never looked up, never written
    assert!(!catalog.queries().contains(&"shows".to_string()));
    assert!(!root.join("shows").join("seasons.json").exists());

    let shows: Vec<ShowDescriptor> = read(&root, "shows.json");
    assert!(shows.is_empty());
}

#[test]
fn test_app_templates_are_copied() {
    let (temp, root) = media_root();
    standard_library(&root);
    let shows_app = temp.path().join("shows.html");
    let show_app = temp.path().join("show.html");
    fs::write(&shows_app, "<h1>Shows</h1>").unwrap();
    fs::write(&show_app, "<h1>Show</h1>").unwrap();

    let config = config(&root)
        .with_shows_app(Some(shows_app))
        .with_show_app(Some(show_app));
    conjoin_library(&config, &catalog(), |_| {}).unwrap();

    assert_eq!(
        fs::read_to_string(root.join("index.html")).unwrap(),
        "<h1>Shows</h1>"
    );
    assert_eq!(
        fs::read_to_string(root.join("Show One (US)").join("index.html")).unwrap(),
        "<h1>Show</h1>"
    );
    assert_eq!(
        fs::read_to_string(root.join("Show Two").join("index.html")).unwrap(),
        "<h1>Show</h1>"
    );
    // only written shows get the page
    assert!(!root.join("Unknown Show").join("index.html").exists());
}

#[test]
fn test_missing_app_template_fails_before_writing() {
    let (temp, root) = media_root();
    standard_library(&root);
    let config = config(&root).with_show_app(Some(temp.path().join("missing.html")));

    let result = conjoin_library(&config, &catalog(), |_| {});

    assert!(matches!(result, Err(ShowtreeError::ReadApp { .. })));
    assert!(!root.join("shows.json").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_unicode_show_directory_is_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (_temp, root) = media_root();
    standard_library(&root);
    fs::create_dir_all(root.join(OsStr::from_bytes(b"Caf\xe9")).join("1")).unwrap();
    let events = Mutex::new(Vec::new());

    let report = conjoin_library(&config(&root), &catalog(), |event| {
        events.lock().unwrap().push(event);
    })
    .unwrap();

    assert_eq!(report.shows.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(events
        .into_inner()
        .unwrap()
        .iter()
        .any(|e| matches!(e, ProgressEvent::ShowsDiscovered { count: 3 })));
}
