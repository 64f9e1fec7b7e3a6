//! Bridge between a page shell and the controllers: commands in, page events out.

pub mod commands;
mod runtime;

use std::sync::Arc;

use tokio::{
    sync::{mpsc, Notify},
    task::JoinHandle,
};

use crate::{
    config::Settings,
    controller::{
        events::{PageEvent, PageEventSink},
        orchestration::{dispatch_page_command, DispatchError, PageControllers},
        sync::SyncTiming,
    },
    labels::Labels,
    page::PageAnchors,
    PortalApi,
};

use self::commands::PageCommand;

const DEFAULT_COMMAND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub labels: Labels,
    pub timing: SyncTiming,
    pub command_capacity: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            labels: Labels::default(),
            timing: SyncTiming::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl PageOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            labels: Labels::new(settings.locale),
            timing: SyncTiming::from_settings(settings),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

/// Page teardown hook that stays usable after the command queue is closed.
#[derive(Debug, Clone)]
pub struct TeardownHandle(Arc<Notify>);

impl TeardownHandle {
    /// Stops sync polling; the runtime exits once outstanding handlers finish.
    pub fn teardown(&self) {
        self.0.notify_one();
    }
}

/// Handle held by the shell for one page lifetime.
///
/// `events` closes once the runtime has stopped and every handler finished.
pub struct PageSession {
    pub commands: mpsc::Sender<PageCommand>,
    pub events: mpsc::UnboundedReceiver<PageEvent>,
    pub teardown: TeardownHandle,
    pub task: JoinHandle<()>,
}

impl PageSession {
    pub fn dispatch(&self, cmd: PageCommand) -> Result<(), DispatchError> {
        dispatch_page_command(&self.commands, cmd)
    }

    /// Stops accepting commands; outstanding handlers still run to completion.
    pub fn close(self) -> (mpsc::UnboundedReceiver<PageEvent>, JoinHandle<()>) {
        (self.events, self.task)
    }
}

/// Attaches the controllers the anchors call for and starts the command loop.
/// Must be called from within a tokio runtime.
pub fn launch(api: Arc<dyn PortalApi>, anchors: &PageAnchors, options: PageOptions) -> PageSession {
    let (sink, events) = PageEventSink::channel();
    let controllers = PageControllers::attach(api, anchors, sink, options.labels, options.timing);
    let (commands, cmd_rx) = mpsc::channel(options.command_capacity.max(1));
    let teardown = Arc::new(Notify::new());
    let task = tokio::spawn(runtime::run(controllers, cmd_rx, Arc::clone(&teardown)));
    PageSession {
        commands,
        events,
        teardown: TeardownHandle(teardown),
        task,
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
