// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for gallery listing and deletion

mod common;

use common::temp_dir;
use notekit::app::{GalleryMessage, GalleryState};
use notekit::storage::{GalleryEntry, delete_entry, list_gallery};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

fn touch(dir: &Path, name: &str, secs: u64) {
    let file = File::create(dir.join(name)).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn names(entries: &[GalleryEntry]) -> Vec<String> {
    entries.iter().map(GalleryEntry::name).collect()
}

#[test]
fn test_list_filters_and_sorts_newest_first() {
    let dir = temp_dir("gallery-order");
    touch(&dir, "a.jpg", 1);
    touch(&dir, "b.png", 2);
    touch(&dir, "c.jpeg", 3);

    let entries = list_gallery(&dir, &["jpg", "jpeg"]);
    assert_eq!(names(&entries), vec!["c.jpeg", "a.jpg"]);
}

#[test]
fn test_extension_match_is_case_sensitive() {
    let dir = temp_dir("gallery-case");
    touch(&dir, "upper.JPG", 1);
    touch(&dir, "lower.jpg", 2);

    let entries = list_gallery(&dir, &["jpg"]);
    assert_eq!(names(&entries), vec!["lower.jpg"]);
}

#[test]
fn test_directories_are_skipped() {
    let dir = temp_dir("gallery-dirs");
    std::fs::create_dir(dir.join("album.jpg")).unwrap();
    touch(&dir, "photo.jpg", 1);

    assert_eq!(names(&list_gallery(&dir, &["jpg"])), vec!["photo.jpg"]);
}

#[cfg(unix)]
#[test]
fn test_symlinked_photos_are_listed() {
    let store = temp_dir("gallery-link-target");
    touch(&store, "original.jpg", 1);
    let dir = temp_dir("gallery-links");
    std::os::unix::fs::symlink(store.join("original.jpg"), dir.join("linked.jpg")).unwrap();
    std::os::unix::fs::symlink(store.join("missing.jpg"), dir.join("dangling.jpg")).unwrap();

    assert_eq!(names(&list_gallery(&dir, &["jpg"])), vec!["linked.jpg"]);
}

#[test]
fn test_missing_directory_is_empty() {
    let dir = std::env::temp_dir().join("notekit-does-not-exist").join("photos");
    assert!(list_gallery(&dir, &["jpg"]).is_empty());
}

#[test]
fn test_empty_directory_is_empty() {
    let dir = temp_dir("gallery-empty");
    assert!(list_gallery(&dir, &["jpg"]).is_empty());
}

#[test]
fn test_delete_nonexistent_returns_false() {
    let entry = GalleryEntry {
        path: temp_dir("gallery-delete").join("ghost.jpg"),
        modified: SystemTime::now(),
    };
    assert!(!delete_entry(&entry));
}

#[test]
fn test_delete_removes_file() {
    let dir = temp_dir("gallery-remove");
    touch(&dir, "a.jpg", 1);
    let entry = list_gallery(&dir, &["jpg"]).remove(0);

    assert!(delete_entry(&entry));
    assert!(!entry.path.exists());
    assert!(list_gallery(&dir, &["jpg"]).is_empty());
}

#[test]
fn test_gallery_overlay_browse_and_delete() {
    let dir = temp_dir("gallery-overlay");
    touch(&dir, "old.jpg", 1);
    touch(&dir, "new.jpg", 2);
    let mut gallery = GalleryState::new(dir.clone(), vec!["jpg".to_string()]);

    gallery.update(GalleryMessage::Show);
    assert!(gallery.is_visible());
    assert_eq!(gallery.selected().unwrap().name(), "new.jpg");

    gallery.update(GalleryMessage::Next);
    gallery.update(GalleryMessage::Next);
    assert_eq!(gallery.selected_index(), 1);

    gallery.update(GalleryMessage::DeleteSelected);
    assert!(!dir.join("old.jpg").exists());
    assert_eq!(gallery.selected().unwrap().name(), "new.jpg");
    assert!(!gallery.take_notices()[0].is_error());

    gallery.update(GalleryMessage::DeleteSelected);
    assert!(!gallery.is_visible());
}

#[test]
fn test_gallery_without_photos_shows_notice() {
    let mut gallery = GalleryState::new(temp_dir("gallery-none"), vec!["jpg".to_string()]);
    gallery.update(GalleryMessage::Show);

    assert!(!gallery.is_visible());
    assert_eq!(gallery.take_notices().len(), 1);
}
