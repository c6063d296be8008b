/*
 * Blocklaunch - A Minecraft Launcher
 * Copyright (C) 2025 Josh Kropf <josh@slashdev.ca>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Natives,
    Classes,
    Assets,
    AssetsCopy,
    Forge
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    ResolvingVersion,
    AcquiringAssets,
    BuildingArguments,
    Spawned,
    Closed,
    Aborted
}

#[derive(Clone, Debug, PartialEq)]
pub enum LaunchEvent {
    State(LaunchState),
    Progress { phase: Phase, task: usize, total: usize },
    Download { name: String, received: u64, total: Option<u64> },
    Debug(String),
    /// One line of game stdout or stderr
    Data(String),
    Close(Option<i32>)
}

/// Sending half of the launch event stream.
///
/// Events are dropped silently once the receiver goes away, a launch never
/// fails because nobody is listening.
#[derive(Clone, Default)]
pub struct Events {
    tx: Option<UnboundedSender<LaunchEvent>>
}

impl Events {
    pub fn channel() -> (Self, UnboundedReceiver<LaunchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Events { tx: Some(tx) }, rx)
    }

    pub fn none() -> Self {
        Events { tx: None }
    }

    pub fn emit(&self, event: LaunchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn state(&self, state: LaunchState) {
        self.emit(LaunchEvent::State(state));
    }

    pub fn debug<S: Into<String>>(&self, msg: S) {
        self.emit(LaunchEvent::Debug(msg.into()));
    }
}

/// Task counter for a single phase, shared by reference between the
/// concurrent tasks of that phase.
pub struct PhaseProgress {
    phase: Phase,
    total: usize,
    counter: AtomicUsize,
    events: Events
}

impl PhaseProgress {
    pub fn begin(events: &Events, phase: Phase, total: usize) -> Self {
        events.emit(LaunchEvent::Progress { phase, task: 0, total });

        PhaseProgress {
            phase,
            total,
            counter: AtomicUsize::new(0),
            events: events.clone()
        }
    }

    pub fn advance(&self) -> usize {
        let task = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        self.events.emit(LaunchEvent::Progress {
            phase: self.phase,
            task,
            total: self.total
        });

        task
    }

    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}
