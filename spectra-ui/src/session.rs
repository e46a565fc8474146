//! Session loop for one channel
//!
//! Inbound events and user commands are processed one at a time and to
//! completion. After each step the controller's outbox is flushed into the
//! channel and the view is presented again. A disconnect ends the session.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use spectra_common::protocol::Request;

use crate::transport::{Channel, ChannelEvent};
use crate::view::ViewController;

/// Receives the view after every step
pub trait Presenter<C> {
    /// Show the current state of the view
    fn present(&mut self, view: &C);

    /// Show a blocking user-visible message
    fn alert(&mut self, message: &str);
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server side went away
    Disconnected(String),
    /// The user closed the command stream
    InputClosed,
}

/// Drive `controller` until the channel drops or the command stream ends
///
/// Returns the controller and presenter so callers can inspect final state.
pub async fn run_session<C, P>(
    mut controller: C,
    mut channel: Channel,
    mut commands: mpsc::Receiver<C::Command>,
    mut presenter: P,
) -> (C, P, SessionEnd)
where
    C: ViewController,
    P: Presenter<C>,
{
    let dispatcher = C::dispatcher();
    debug!(
        "Session for {} handles {:?}",
        channel.namespace(),
        dispatcher.events()
    );
    presenter.present(&controller);

    let end = loop {
        tokio::select! {
            event = channel.next_event() => match event {
                ChannelEvent::Message { event, payload } => {
                    debug!("Received {}", event);
                    if let Err(e) = dispatcher.dispatch(&mut controller, &event, payload) {
                        warn!("Cannot handle {}: {}", event, e);
                    }
                }
                ChannelEvent::Disconnected(reason) => {
                    controller.disconnected();
                    show(&mut controller, &mut presenter);
                    break SessionEnd::Disconnected(reason);
                }
            },
            command = commands.recv() => match command {
                Some(command) => {
                    if let Err(e) = controller.apply(command) {
                        presenter.alert(&e.to_string());
                    }
                }
                None => {
                    info!("Command input closed, leaving {}", channel.namespace());
                    break SessionEnd::InputClosed;
                }
            },
        }

        for request in controller.take_outbox() {
            if let Err(e) = channel.send(&request) {
                warn!("Dropping {}: {}", request.event_name(), e);
            }
        }
        show(&mut controller, &mut presenter);
    };

    (controller, presenter, end)
}

fn show<C, P>(controller: &mut C, presenter: &mut P)
where
    C: ViewController,
    P: Presenter<C>,
{
    for alert in controller.take_alerts() {
        presenter.alert(&alert);
    }
    presenter.present(controller);
}
