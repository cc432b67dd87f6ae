pub mod message;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::bot::AppState;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub struct BotHandler {
    pub state: AppState,
}

impl BotHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let state = self.state.clone();
        let state_text = self.state.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |msg: Message, cmd: crate::bot::commands::Command| {
                        let state = state.clone();
                        async move { message::command_handler(msg, cmd, state).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let state = state_text.clone();
                async move { message::text_handler(msg, state).await }
            }))
    }
}
