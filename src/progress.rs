// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for long-running operations
//!
//! Lets the aggregator report what it is doing while a release is
//! inspected, which the CLI shows on a spinner.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    /// Reading the release record from storage
    LoadingRelease { release: String },
    /// Fetching the cluster's resource catalog
    Discovering,
    /// Starting to inspect the release's resources
    Enriching { total: usize },
    /// One resource finished
    ResourceComplete {
        kind: String,
        name: String,
        done: usize,
        total: usize,
    },
}

/// Global progress reporter
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn loading_release(&self, release: &str) {
        let _ = self.sender.send(ProgressUpdate::LoadingRelease {
            release: release.to_string(),
        });
    }

    pub fn discovering(&self) {
        let _ = self.sender.send(ProgressUpdate::Discovering);
    }

    pub fn enriching(&self, total: usize) {
        let _ = self.sender.send(ProgressUpdate::Enriching { total });
    }

    /// Report one finished resource; `done` counts completions so far
    pub fn resource_complete(&self, kind: &str, name: &str, done: usize, total: usize) {
        let _ = self.sender.send(ProgressUpdate::ResourceComplete {
            kind: kind.to_string(),
            name: name.to_string(),
            done,
            total,
        });
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
