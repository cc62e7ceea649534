// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` routes each message to the controller that owns it, then moves
//! the notices the controllers produced onto the notice board.

use crate::app::camera::CameraMessage;
use crate::app::gallery::GalleryMessage;
use crate::app::state::{AppModel, Message, Screen};
use crate::app::task::Task;
use std::time::Instant;
use tracing::{debug, info};

impl AppModel {
    /// Main message handler
    pub fn update(&mut self, message: Message) -> Task<Message> {
        let task = match message {
            Message::Show(screen) => self.handle_show(screen),
            Message::Hide => {
                self.handle_hide();
                Task::none()
            }
            Message::Camera(msg) => self.camera.update(msg).map(Message::Camera),
            Message::Gallery(msg) => {
                self.gallery.update(msg);
                Task::none()
            }
            Message::Recording(msg) => self.recording.update(msg).map(Message::Recording),
            Message::Scan(msg) => self.scanner.update(msg).map(Message::Scan),
            Message::Tick => {
                self.notices.expire(Instant::now());
                Task::none()
            }
        };

        self.collect_notices();
        task
    }

    fn handle_show(&mut self, screen: Screen) -> Task<Message> {
        if self.screen == Some(screen) {
            debug!(screen = ?screen, "Screen already visible");
            return Task::none();
        }
        self.handle_hide();

        info!(screen = ?screen, "Showing screen");
        self.screen = Some(screen);
        match screen {
            Screen::Camera => self.camera.update(CameraMessage::Activate).map(Message::Camera),
            Screen::Audio | Screen::Scanner => Task::none(),
        }
    }

    /// Tear down whatever the visible screen holds
    fn handle_hide(&mut self) {
        let Some(screen) = self.screen.take() else {
            return;
        };

        debug!(screen = ?screen, "Hiding screen");
        match screen {
            Screen::Camera => {
                self.gallery.update(GalleryMessage::Hide);
                self.camera.deactivate();
            }
            Screen::Audio => self.recording.teardown(),
            Screen::Scanner => self.scanner.teardown(),
        }
    }

    fn collect_notices(&mut self) {
        let now = Instant::now();
        let produced = self
            .camera
            .take_notices()
            .into_iter()
            .chain(self.gallery.take_notices())
            .chain(self.recording.take_notices())
            .chain(self.scanner.take_notices());
        for notice in produced {
            self.notices.push_at(notice, now);
        }
    }
}
