//! Behaviour every backend must share. Each test file instantiates its
//! backend and runs these against a fresh temp directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use filedepot_storage::{
  ErrorKind, Storage, StorageError, StoreDescriptor, current_version, info, next_version_path,
  url, versions,
};

pub type Factory = fn(StoreDescriptor) -> Box<dyn Storage>;

pub struct Fixture {
  _dir: tempfile::TempDir,
  /// The store's base path.
  pub base: PathBuf,
  /// Scratch space for local files.
  pub work: PathBuf,
}

impl Fixture {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let base = dir.path().join("store");
    let work = dir.path().join("work");
    fs::create_dir_all(&work).expect("failed to create work dir");
    Self {
      _dir: dir,
      base,
      work,
    }
  }

  pub fn store(&self) -> StoreDescriptor {
    StoreDescriptor::local("test", self.base.to_string_lossy())
  }

  /// Write `content` to `{work}/{name}` and return the path.
  pub fn write(&self, name: &str, content: &str) -> PathBuf {
    let path = self.work.join(name);
    fs::write(&path, content).expect("failed to write local file");
    path
  }

  /// Lay out `{base}/{handle}/{version}/{filename}` directly.
  pub fn seed(&self, handle: &str, version: u64, filename: &str, content: &str) {
    let dir = self.base.join(handle).join(version.to_string());
    fs::create_dir_all(&dir).expect("failed to create version dir");
    fs::write(dir.join(filename), content).expect("failed to seed version");
  }

  pub fn stored(&self, handle: &str, version: u64, filename: &str) -> String {
    fs::read_to_string(self.base.join(handle).join(version.to_string()).join(filename))
      .expect("failed to read stored version")
  }
}

fn hint(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn version_numbers(storage: &dyn Storage, handle: &str) -> Vec<u64> {
  versions(storage, handle)
    .unwrap()
    .iter()
    .map(|row| row.version)
    .collect()
}

pub fn push_creates_version_directory(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("testfile.txt", "hello world");

  assert_eq!(current_version(storage.as_ref(), "myhandle").unwrap(), 0);
  assert_eq!(storage.push("myhandle", &file).unwrap(), 1);

  assert_eq!(fx.stored("myhandle", 1, "testfile.txt"), "hello world");
  assert_eq!(current_version(storage.as_ref(), "myhandle").unwrap(), 1);
}

pub fn push_increments_version(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  for content in ["v1", "v2", "v3"] {
    let file = fx.write("testfile.txt", content);
    storage.push("handle", &file).unwrap();
  }

  assert_eq!(version_numbers(storage.as_ref(), "handle"), vec![3, 2, 1]);
  assert_eq!(fx.stored("handle", 1, "testfile.txt"), "v1");
  assert_eq!(fx.stored("handle", 2, "testfile.txt"), "v2");
  assert_eq!(fx.stored("handle", 3, "testfile.txt"), "v3");
}

pub fn next_version_path_is_derived_only(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  let path = next_version_path(storage.as_ref(), "fresh").unwrap();
  assert_eq!(path, format!("{}/fresh/1", fx.base.to_string_lossy()));
  assert!(!fx.base.join("fresh").exists());
}

pub fn next_version_path_is_where_push_lands(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("a.txt", "x");

  let predicted = next_version_path(storage.as_ref(), "/docs/").unwrap();
  storage.push("/docs/", &file).unwrap();
  assert_eq!(PathBuf::from(&predicted), fx.base.join("docs").join("1"));
  assert!(Path::new(&predicted).join("a.txt").is_file());

  let err = next_version_path(storage.as_ref(), "a/../b").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidHandle);
}

pub fn push_missing_file_fails(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  let err = storage
    .push("handle", &fx.work.join("nonexistent.txt"))
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(err.to_string().contains("file not found"));
  assert!(!fx.base.join("handle").exists());
}

pub fn push_sanitizes_handle(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("a.txt", "x");

  storage.push("my report (final)", &file).unwrap();

  assert_eq!(fx.stored("my_report__final_", 1, "a.txt"), "x");
  assert_eq!(version_numbers(storage.as_ref(), "my report (final)"), vec![1]);
}

pub fn invalid_handle_is_rejected(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("a.txt", "x");

  for handle in ["", "..", "a/../../b"] {
    let err = storage.push(handle, &file).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle, "{handle:?}");
    assert!(storage.delete(handle, None).is_err());
  }
}

pub fn delete_all_versions(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("testfile.txt", "content");
  for _ in 0..3 {
    storage.push("myhandle", &file).unwrap();
  }
  assert!(fx.base.join("myhandle").is_dir());

  storage.delete("myhandle", None).unwrap();

  assert!(!fx.base.join("myhandle").exists());
  assert!(versions(storage.as_ref(), "myhandle").unwrap().is_empty());
}

pub fn delete_specific_version_never_reuses_numbers(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  for content in ["v1", "v2", "v3"] {
    storage
      .push("handle", &fx.write("testfile.txt", content))
      .unwrap();
  }

  storage.delete("handle", Some(2)).unwrap();

  assert_eq!(version_numbers(storage.as_ref(), "handle"), vec![3, 1]);
  assert!(!fx.base.join("handle").join("2").exists());
  assert_eq!(fx.stored("handle", 1, "testfile.txt"), "v1");
  assert_eq!(fx.stored("handle", 3, "testfile.txt"), "v3");

  let version = storage
    .push("handle", &fx.write("testfile.txt", "v4"))
    .unwrap();
  assert_eq!(version, 4);
  assert_eq!(version_numbers(storage.as_ref(), "handle"), vec![4, 3, 1]);
}

pub fn delete_last_version_removes_handle(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  storage
    .push("single", &fx.write("testfile.txt", "content"))
    .unwrap();
  storage
    .push("other", &fx.write("testfile.txt", "content"))
    .unwrap();
  assert_eq!(storage.ls().unwrap(), vec!["other", "single"]);

  storage.delete("single", Some(1)).unwrap();

  assert!(!fx.base.join("single").exists());
  assert_eq!(storage.ls().unwrap(), vec!["other"]);
}

pub fn delete_missing_is_noop(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  storage.delete("nonexistent", None).unwrap();
  storage.delete("nonexistent", Some(3)).unwrap();

  storage
    .push("handle", &fx.write("testfile.txt", "content"))
    .unwrap();
  storage.delete("handle", Some(99)).unwrap();
  assert_eq!(version_numbers(storage.as_ref(), "handle"), vec![1]);
}

pub fn pull_latest_version(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("testhandle", 1, "data.txt", "version 1");
  fx.seed("testhandle", 2, "data.txt", "version 2");

  let out = fx.work.join("out");
  fs::create_dir(&out).unwrap();

  let result = storage
    .pull("testhandle", None, Some(&hint(&out)))
    .unwrap();
  assert_eq!(result, out.join("data.txt"));
  assert_eq!(fs::read_to_string(&result).unwrap(), "version 2");
}

pub fn pull_specific_version_to_exact_path(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("testhandle", 1, "remote.txt", "version 1");
  fx.seed("testhandle", 2, "remote.txt", "version 2");

  let target = fx.work.join("custom.txt");
  let result = storage
    .pull("testhandle", Some(1), Some(&hint(&target)))
    .unwrap();
  assert_eq!(result, target);
  assert_eq!(fs::read_to_string(&target).unwrap(), "version 1");

  // Pulling again overwrites.
  storage
    .pull("testhandle", Some(2), Some(&hint(&target)))
    .unwrap();
  assert_eq!(fs::read_to_string(&target).unwrap(), "version 2");
}

pub fn pull_errors_leave_no_file(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let target = fx.work.join("out.txt");

  let err = storage
    .pull("nonexistent", None, Some(&hint(&target)))
    .unwrap_err();
  assert!(matches!(err, StorageError::HandleNotFound { .. }));
  assert!(err.to_string().contains("no versions found"));

  fx.seed("testhandle", 1, "data.txt", "content");
  let err = storage
    .pull("testhandle", Some(99), Some(&hint(&target)))
    .unwrap_err();
  assert!(matches!(err, StorageError::VersionNotFound { version: 99, .. }));
  assert!(err.to_string().contains("version 99 not found"));

  assert!(!target.exists());
  assert_eq!(fs::read_dir(&fx.work).unwrap().count(), 0);
}

pub fn pull_empty_version_is_not_found(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fs::create_dir_all(fx.base.join("hollow").join("1")).unwrap();

  let err = storage.pull_info("hollow", None, None).unwrap_err();
  assert!(matches!(err, StorageError::EmptyVersion { version: 1, .. }));
  assert!(err.is_not_found());

  let data = storage.versions_data("hollow").unwrap();
  assert_eq!(data.len(), 1);
  assert_eq!(data[0].filename, None);
  assert_eq!(data[0].url, None);
}

pub fn pull_info_resolves_without_transfer(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("testhandle", 1, "myfile.txt", "content");

  let dir_hint = format!("{}/custom/path/", fx.work.to_string_lossy());
  let info = storage
    .pull_info("testhandle", None, Some(&dir_hint))
    .unwrap();

  assert_eq!(info.remote_filename, "myfile.txt");
  assert_eq!(info.version, 1);
  assert_eq!(info.target_path, fx.work.join("custom/path/myfile.txt"));
  assert!(!fx.work.join("custom").exists());
}

pub fn stray_entries_are_ignored(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("handle", 1, "a.txt", "one");
  fs::write(fx.base.join("handle").join("notes.txt"), "stray").unwrap();
  fs::create_dir_all(fx.base.join("handle").join("0")).unwrap();
  fs::write(fx.base.join("loose-file"), "not a handle").unwrap();

  assert_eq!(version_numbers(storage.as_ref(), "handle"), vec![1]);
  assert_eq!(storage.push("handle", &fx.write("a.txt", "two")).unwrap(), 2);
  assert_eq!(storage.ls().unwrap(), vec!["handle"]);
}

pub fn first_file_is_lexicographic(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("handle", 1, "b.txt", "b");
  fx.seed("handle", 1, "a.txt", "a");

  let info = storage.pull_info("handle", None, None).unwrap();
  assert_eq!(info.remote_filename, "a.txt");
}

pub fn versions_data_fields(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("myhandle", 1, "doc.pdf", "content");
  fx.seed("myhandle", 2, "doc.pdf", "content 2");

  let data = storage.versions_data("myhandle").unwrap();

  assert_eq!(data.len(), 2);
  assert_eq!(data[0].version, 2);
  assert_eq!(data[1].version, 1);
  let latest = &data[0];
  assert_eq!(latest.handle, "myhandle");
  assert_eq!(latest.filename.as_deref(), Some("doc.pdf"));
  assert!(latest.path.ends_with("myhandle/2/doc.pdf"));
  assert!(latest.datetime.is_some());
  assert!(latest.size.is_some());
  assert_eq!(latest.url, None);

  let rows = versions(storage.as_ref(), "myhandle").unwrap();
  assert!(!rows[0].datetime.is_empty());
  assert!(!rows[0].size.is_empty());
}

pub fn versions_data_empty_for_missing_handle(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  assert!(storage.versions_data("nothing").unwrap().is_empty());
  assert!(storage.version_numbers("nothing").unwrap().is_empty());
  assert!(storage.handles_data().unwrap().is_empty());
}

pub fn public_urls(make: Factory) {
  let fx = Fixture::new();
  let storage = make(
    fx.store()
      .with_public_base_url("https://example.com/files/"),
  );
  fx.seed("test", 1, "file.txt", "content");

  let data = storage.versions_data("test").unwrap();
  assert_eq!(
    data[0].url.as_deref(),
    Some("https://example.com/files/test/1/file.txt")
  );

  let info = info(storage.as_ref(), "test").unwrap();
  assert_eq!(info.current_version, 1);
  assert!(info.updated_at.is_some());
  assert_eq!(
    info.latest_version_url.as_deref(),
    Some("https://example.com/files/test/1/file.txt")
  );

  assert_eq!(
    url(storage.as_ref(), "test", 7, "x.bin").as_deref(),
    Some("https://example.com/files/test/7/x.bin")
  );
  assert_eq!(url(storage.as_ref(), "test", 7, ""), None);
}

pub fn public_url_of_slashed_handle(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store().with_public_base_url("https://ex.com/files/"));

  storage.push("/docs", &fx.write("a.txt", "x")).unwrap();

  let data = storage.versions_data("/docs").unwrap();
  assert!(data[0].path.ends_with("store/docs/1/a.txt"));
  assert_eq!(
    data[0].url.as_deref(),
    Some("https://ex.com/files/docs/1/a.txt")
  );
  assert_eq!(
    url(storage.as_ref(), "/docs", 1, "a.txt").as_deref(),
    Some("https://ex.com/files/docs/1/a.txt")
  );
}

pub fn info_without_public_url(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  fx.seed("handle", 1, "file.txt", "content");

  let info = info(storage.as_ref(), "handle").unwrap();
  assert_eq!(info.handle, "handle");
  assert_eq!(info.remote_base_path, fx.base.to_string_lossy());
  assert_eq!(info.current_version, 1);
  assert!(info.updated_at.is_some());
  assert_eq!(info.latest_version_url, None);
  assert_eq!(url(storage.as_ref(), "handle", 1, "file.txt"), None);
}

pub fn info_for_missing_handle(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());

  let info = info(storage.as_ref(), "nonexistent").unwrap();
  assert_eq!(info.handle, "nonexistent");
  assert_eq!(info.current_version, 0);
  assert_eq!(info.updated_at, None);
  assert_eq!(info.latest_version_url, None);
}

pub fn handles_data_summaries(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.write("a.txt", "content");
  storage.push("beta", &file).unwrap();
  storage.push("alpha", &file).unwrap();
  storage.push("alpha", &file).unwrap();

  let handles = storage.handles_data().unwrap();
  let summary: Vec<(&str, usize)> = handles
    .iter()
    .map(|h| (h.handle.as_str(), h.versions_count))
    .collect();
  assert_eq!(summary, vec![("alpha", 2), ("beta", 1)]);
  assert!(handles.iter().all(|h| h.size.is_some()));
}

/// Push v1, push v2, pull latest and v1, delete v1.
pub fn round_trip_scenario(make: Factory) {
  let fx = Fixture::new();
  let storage = make(fx.store());
  let file = fx.work.join("a.txt");

  fs::write(&file, "v1").unwrap();
  assert_eq!(storage.push("h", &file).unwrap(), 1);
  fs::write(&file, "v2").unwrap();
  assert_eq!(storage.push("h", &file).unwrap(), 2);

  let target = fx.work.join("pulled.txt");
  storage.pull("h", None, Some(&hint(&target))).unwrap();
  assert_eq!(fs::read_to_string(&target).unwrap(), "v2");
  storage.pull("h", Some(1), Some(&hint(&target))).unwrap();
  assert_eq!(fs::read_to_string(&target).unwrap(), "v1");

  storage.delete("h", Some(1)).unwrap();
  assert_eq!(version_numbers(storage.as_ref(), "h"), vec![2]);
}
