// SPDX-License-Identifier: GPL-3.0-only

//! Photo gallery overlay on the camera screen

use super::notice::Notice;
use crate::fl;
use crate::storage::{GalleryEntry, delete_entry, list_gallery};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryMessage {
    Show,
    Hide,
    Next,
    Previous,
    OpenSelected,
    DeleteSelected,
}

#[derive(Debug)]
pub struct GalleryState {
    dir: PathBuf,
    extensions: Vec<String>,
    entries: Vec<GalleryEntry>,
    selected: usize,
    visible: bool,
    notices: Vec<Notice>,
}

impl GalleryState {
    pub fn new(dir: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            dir,
            extensions,
            entries: Vec::new(),
            selected: 0,
            visible: false,
            notices: Vec::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&GalleryEntry> {
        self.entries.get(self.selected)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Re-read the directory, keeping the selection in range
    pub fn refresh(&mut self) {
        self.entries = list_gallery(&self.dir, self.extensions.as_slice());
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }

    pub fn update(&mut self, message: GalleryMessage) {
        match message {
            GalleryMessage::Show => {
                self.selected = 0;
                self.refresh();
                if self.entries.is_empty() {
                    self.notices.push(Notice::info(fl!("no-photos")));
                } else {
                    self.visible = true;
                }
            }
            GalleryMessage::Hide => self.visible = false,
            GalleryMessage::Next => {
                if self.selected + 1 < self.entries.len() {
                    self.selected += 1;
                }
            }
            GalleryMessage::Previous => self.selected = self.selected.saturating_sub(1),
            GalleryMessage::OpenSelected => {
                if let Some(entry) = self.selected() {
                    info!(path = %entry.path.display(), "Opening photo");
                    if let Err(e) = open::that_detached(&entry.path) {
                        warn!(error = %e, "Failed to open photo");
                        self.notices
                            .push(Notice::error(fl!("open-failed", reason = e.to_string())));
                    }
                }
            }
            GalleryMessage::DeleteSelected => {
                let Some(entry) = self.selected().cloned() else {
                    return;
                };
                if delete_entry(&entry) {
                    self.notices.push(Notice::info(fl!("photo-deleted")));
                } else {
                    self.notices.push(Notice::error(fl!("photo-delete-failed")));
                }
                self.refresh();
                if self.entries.is_empty() {
                    self.visible = false;
                }
            }
        }
    }
}
