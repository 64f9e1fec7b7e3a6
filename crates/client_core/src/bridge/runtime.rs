//! Runtime loop between the shell's command queue and the page controllers.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, Notify},
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{bridge::commands::PageCommand, controller::orchestration::PageControllers};

/// Runs until the command queue is closed (or torn down) and every handler has finished.
pub(crate) async fn run(
    controllers: PageControllers,
    mut commands: mpsc::Receiver<PageCommand>,
    teardown: Arc<Notify>,
) {
    let mut handlers = JoinSet::new();
    if let Some(cmd) = controllers.on_load() {
        handle(&controllers, cmd, &mut handlers);
    }

    let mut accepting = true;
    loop {
        tokio::select! {
            cmd = commands.recv(), if accepting => match cmd {
                Some(PageCommand::Teardown) => {
                    tear_down(&controllers);
                    commands.close();
                    accepting = false;
                }
                Some(cmd) => handle(&controllers, cmd, &mut handlers),
                None => {
                    debug!("command queue closed");
                    accepting = false;
                }
            },
            () = teardown.notified() => {
                tear_down(&controllers);
                commands.close();
                accepting = false;
            }
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => log_join(joined),
        }
        if !accepting && handlers.is_empty() {
            break;
        }
    }
    debug!("page runtime stopped");
}

fn tear_down(controllers: &PageControllers) {
    info!("page teardown");
    if let Some(sync) = &controllers.sync {
        sync.shutdown();
    }
}

fn handle(controllers: &PageControllers, cmd: PageCommand, handlers: &mut JoinSet<()>) {
    let name = cmd.name();
    match cmd {
        PageCommand::RegionChanged { region } => match &controllers.district {
            Some(loader) => {
                let loader = Arc::clone(loader);
                handlers.spawn(async move {
                    // Failures are logged inside the loader; the sentinel stays.
                    let _ = loader.region_changed(&region).await;
                });
            }
            None => ignored(name),
        },
        PageCommand::SyncClicked { form } => match &controllers.sync {
            Some(sync) => {
                let sync = Arc::clone(sync);
                handlers.spawn(async move {
                    let outcome = sync.run(form).await;
                    debug!(?outcome, "sync handler finished");
                });
            }
            None => ignored(name),
        },
        PageCommand::SaveClicked { item_id } => match &controllers.save {
            Some(save) => {
                let save = Arc::clone(save);
                handlers.spawn(async move {
                    let _ = save.click(&item_id).await;
                });
            }
            None => ignored(name),
        },
        PageCommand::CancelSync => match &controllers.sync {
            Some(sync) => sync.cancel(),
            None => ignored(name),
        },
        PageCommand::Teardown => tear_down(controllers),
    }
}

fn ignored(command: &str) {
    debug!(command, "no controller attached for command");
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "page handler task failed");
    }
}
