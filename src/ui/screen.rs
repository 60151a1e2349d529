//! The timer screen

use std::{
    io::{self, Write},
    num::NonZeroU32,
    sync::Arc,
};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use super::command::{Command, HELP};
use crate::{
    controller::TimerController,
    error::TimerError,
    notifications::NotificationGateway,
    state::{Notice, TimerState},
    utils::shutdown_signal,
};

/// What the input loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Help,
    Exit,
}

/// Single screen hosting the timer controller and the notification gateway
pub struct Screen {
    gateway: Arc<NotificationGateway>,
    controller: TimerController,
    field: String,
}

impl Screen {
    pub fn new(gateway: Arc<NotificationGateway>, minutes: NonZeroU32) -> Self {
        Self {
            controller: TimerController::new(Arc::clone(&gateway), minutes),
            gateway,
            field: minutes.to_string(),
        }
    }

    pub fn controller(&self) -> &TimerController {
        &self.controller
    }

    /// Contents of the duration field
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Register for notifications. Returns the advisory to show when the
    /// screen has to run without them.
    pub async fn mount(&self) -> Option<Notice> {
        let registration = self.gateway.initialize().await;
        registration.advisory().map(Notice::Advisory)
    }

    /// Apply one command. Failures come back as the notice to show.
    pub async fn dispatch(&mut self, command: Command) -> Result<Control, Notice> {
        let result = match command {
            Command::Toggle => self.controller.toggle(&self.field).await.map(|_| Control::Continue),
            Command::Stop => self.controller.stop().await.map(|_| Control::Continue),
            Command::Duration(input) => self.update_field(input),
            Command::Help => Ok(Control::Help),
            Command::Quit => Ok(Control::Exit),
        };

        result.map_err(|e| {
            warn!("{}", e);
            e.notice()
        })
    }

    fn update_field(&mut self, input: String) -> Result<Control, TimerError> {
        self.controller.set_configured_duration(&input)?;
        self.field = input;
        Ok(Control::Continue)
    }

    /// Tear everything down before the screen goes away
    pub async fn unmount(self) {
        self.controller.shutdown().await;
        self.gateway.dispose();
        info!("Screen unmounted");
    }

    /// Interactive loop over stdin until quit, end of input or a shutdown signal
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut updates = self.controller.subscribe();
        let mut notices = self.controller.notices();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        if let Some(notice) = self.mount().await {
            show_notice(&notice);
        }
        println!("{HELP}");
        render(&self.controller.state()?);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match self.dispatch(Command::parse(&line)).await {
                        Ok(Control::Continue) => {}
                        Ok(Control::Help) => println!("{HELP}"),
                        Ok(Control::Exit) => break,
                        Err(notice) => show_notice(&notice),
                    },
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                },
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    render(&state);
                },
                notice = notices.recv() => {
                    if let Ok(notice) = notice {
                        show_notice(&notice);
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        println!();
        self.unmount().await;
        Ok(())
    }
}

fn render(state: &TimerState) {
    let label = if state.running { "running" } else { "stopped" };
    print!("\r{}  [{}]   ", state.display(), label);
    let _ = io::stdout().flush();
}

fn show_notice(notice: &Notice) {
    if notice.is_blocking() {
        eprint!("\x07");
    }
    println!("\n{}", notice);
}
