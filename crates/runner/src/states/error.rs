use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::error;
use meridian_core::Notification;

/// Reports the failure that led here
#[derive(Debug, Default)]
pub struct ErrorState;

impl State for ErrorState {
    fn setup(&mut self) {}

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        let previous = ctx.previous;
        let message = ctx
            .agent
            .last_error
            .get_or_insert_with(|| format!("{} timed out", previous))
            .clone();
        error!("[LOOP] {} failed: {}", previous, message);
        ctx.notify(Notification::Error {
            state: previous.to_string(),
            message,
        })
        .await;
        Ok(Some(Event::Done))
    }
}
