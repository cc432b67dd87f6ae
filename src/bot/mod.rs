pub mod commands;
pub mod handlers;
pub mod wizard;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::database::repository::Repository;
use crate::messenger::Messenger;
use crate::services::collector::AnswerCollector;
use crate::bot::wizard::Wizard;

/// Everything the handlers need, cloned into each dispatcher endpoint.
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub messenger: Arc<dyn Messenger>,
    pub collector: Arc<AnswerCollector>,
    /// Operator chat id -> in-progress question draft. Each conversation
    /// owns its own wizard; there is no shared draft.
    pub wizards: Arc<Mutex<HashMap<i64, Wizard>>>,
}

impl AppState {
    pub fn new(
        repo: Repository,
        messenger: Arc<dyn Messenger>,
        collector: Arc<AnswerCollector>,
    ) -> Self {
        Self {
            repo,
            messenger,
            collector,
            wizards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn lock_wizards(&self) -> MutexGuard<'_, HashMap<i64, Wizard>> {
        match self.wizards.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
