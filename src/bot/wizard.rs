//! The question draft wizard: a linear state machine driven by the
//! operator's replies. Steps are pure so they can be tested without a
//! transport; the dispatcher owns a per-chat `Wizard` instance and feeds
//! it each incoming message.

use chrono::{DateTime, Utc};

use crate::database::models::{NewQuestion, User};
use crate::utils::datetime::parse_schedule;

pub const CANCEL: &str = "Cancel";
pub const BACK: &str = "Back";
pub const FREE_FORM: &str = "Free-form answer";
pub const FOR_ALL: &str = "Send to everyone";
pub const SEND_NOW: &str = "Send now";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Text,
    Options,
    Targeting,
    Required,
    Schedule,
}

impl WizardState {
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Text => "Question text:",
            Self::Options => "Answer options, separated by semicolons:",
            Self::Targeting => {
                "Roles and users (@name) who should receive the question, separated by semicolons:"
            }
            Self::Required => "Is an answer required?",
            Self::Schedule => "When should it be sent? Use DD.MM.YYYY HH:MM",
        }
    }

    /// Reply-keyboard buttons offered alongside the prompt.
    pub fn buttons(self) -> Vec<String> {
        let mut buttons: Vec<&str> = match self {
            Self::Text => vec![],
            Self::Options => vec![FREE_FORM],
            Self::Targeting => vec![FOR_ALL],
            Self::Required => vec!["Yes", "No"],
            Self::Schedule => vec![SEND_NOW],
        };
        if self != Self::Text {
            buttons.push(BACK);
        }
        buttons.push(CANCEL);
        buttons.into_iter().map(String::from).collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Draft {
    text: String,
    for_all: bool,
    roles_for: Vec<String>,
    users_for: Vec<i64>,
    answer_options: Vec<String>,
    optional: bool,
}

/// Outcome of feeding one reply to the wizard. `Prompt` means the caller
/// should send any notices followed by the prompt for the wizard's
/// (possibly unchanged) current state.
#[derive(Debug)]
pub enum StepResult {
    Prompt { notices: Vec<String> },
    Cancelled,
    Completed(NewQuestion),
}

#[derive(Debug)]
pub struct Wizard {
    state: WizardState,
    draft: Draft,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            state: WizardState::Text,
            draft: Draft::default(),
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Consumes one operator reply. Malformed input never fails the
    /// wizard; it re-prompts at a well-defined state instead. `roster` is
    /// only consulted when resolving `@handles` in the targeting step.
    pub fn advance(&mut self, input: &str, roster: &[User], now: DateTime<Utc>) -> StepResult {
        let input = input.trim();
        if input == CANCEL {
            return StepResult::Cancelled;
        }

        match self.state {
            WizardState::Text => {
                if input.is_empty() {
                    return StepResult::Prompt {
                        notices: vec!["The question text cannot be empty.".to_string()],
                    };
                }
                self.draft.text = input.to_string();
                self.state = WizardState::Options;
            }
            WizardState::Options => {
                if input == BACK {
                    self.state = WizardState::Text;
                    return StepResult::Prompt { notices: vec![] };
                }
                if input == FREE_FORM {
                    self.draft.answer_options = vec![];
                } else {
                    self.draft.answer_options = split_tokens(input);
                }
                self.state = WizardState::Targeting;
            }
            WizardState::Targeting => {
                if input == BACK {
                    self.state = WizardState::Options;
                    return StepResult::Prompt { notices: vec![] };
                }
                let mut notices = vec![];
                if input == FOR_ALL {
                    self.draft.for_all = true;
                    self.draft.roles_for = vec![];
                    self.draft.users_for = vec![];
                } else {
                    self.draft.for_all = false;
                    let (users, roles, unresolved) = classify_targets(input, roster);
                    self.draft.users_for = users;
                    self.draft.roles_for = roles;
                    for handle in unresolved {
                        notices.push(format!("@{handle} is not registered"));
                    }
                }
                self.state = WizardState::Required;
                return StepResult::Prompt { notices };
            }
            WizardState::Required => {
                if input == BACK {
                    self.state = WizardState::Targeting;
                    return StepResult::Prompt { notices: vec![] };
                }
                // "Yes" means the answer is required, i.e. NOT optional.
                match input.to_lowercase().as_str() {
                    "yes" => self.draft.optional = false,
                    "no" => self.draft.optional = true,
                    _ => {
                        return StepResult::Prompt {
                            notices: vec!["Please answer Yes or No.".to_string()],
                        }
                    }
                }
                self.state = WizardState::Schedule;
            }
            WizardState::Schedule => {
                if input == BACK {
                    self.state = WizardState::Required;
                    return StepResult::Prompt { notices: vec![] };
                }
                let send_at = if input == SEND_NOW {
                    now
                } else {
                    match parse_schedule(input) {
                        Ok(dt) => dt,
                        Err(_) => {
                            return StepResult::Prompt {
                                notices: vec![
                                    "That date did not parse; use DD.MM.YYYY HH:MM.".to_string(),
                                ],
                            }
                        }
                    }
                };
                let draft = &self.draft;
                return StepResult::Completed(NewQuestion {
                    text: draft.text.clone(),
                    for_all: draft.for_all,
                    roles_for: draft.roles_for.clone(),
                    users_for: draft.users_for.clone(),
                    answer_options: draft.answer_options.clone(),
                    optional: draft.optional,
                    send_at,
                });
            }
        }

        StepResult::Prompt { notices: vec![] }
    }
}

/// Splits on `;`, trims each token, keeps order, does not dedup.
fn split_tokens(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Classifies targeting tokens: a token containing `@` is a user handle
/// resolved against the roster, anything else is a role name. Unresolvable
/// handles are reported, not fatal.
fn classify_targets(input: &str, roster: &[User]) -> (Vec<i64>, Vec<String>, Vec<String>) {
    let mut users = vec![];
    let mut roles = vec![];
    let mut unresolved = vec![];
    for token in input.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(at) = token.find('@') {
            let handle = token[at + 1..].trim();
            match roster
                .iter()
                .find(|u| u.username.as_deref() == Some(handle))
            {
                Some(user) => users.push(user.tg_user_id),
                None => unresolved.push(handle.to_string()),
            }
        } else {
            roles.push(token.to_string());
        }
    }
    (users, roles, unresolved)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roster() -> Vec<User> {
        vec![
            User {
                tg_user_id: 1,
                username: Some("alice".to_string()),
                display_name: "Alice".to_string(),
                roles_json: "[]".to_string(),
                admin: true,
                answered_last_question: true,
                reminder_count: 0,
            },
            User {
                tg_user_id: 2,
                username: Some("bob".to_string()),
                display_name: "Bob".to_string(),
                roles_json: r#"["qa"]"#.to_string(),
                admin: false,
                answered_last_question: true,
                reminder_count: 0,
            },
        ]
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn step(wizard: &mut Wizard, input: &str) -> StepResult {
        wizard.advance(input, &roster(), now())
    }

    #[test]
    fn happy_path_choice_question() {
        let mut w = Wizard::new();
        assert!(matches!(step(&mut w, "Ready for standup?"), StepResult::Prompt { .. }));
        assert_eq!(w.state(), WizardState::Options);

        step(&mut w, "Yes; No; Maybe");
        assert_eq!(w.state(), WizardState::Targeting);

        step(&mut w, FOR_ALL);
        assert_eq!(w.state(), WizardState::Required);

        step(&mut w, "Yes");
        assert_eq!(w.state(), WizardState::Schedule);

        match step(&mut w, "24.12.2024 18:30") {
            StepResult::Completed(q) => {
                assert_eq!(q.text, "Ready for standup?");
                assert_eq!(q.answer_options, vec!["Yes", "No", "Maybe"]);
                assert!(q.for_all);
                assert!(!q.optional);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn free_form_and_send_now() {
        let mut w = Wizard::new();
        step(&mut w, "Any feedback?");
        step(&mut w, FREE_FORM);
        step(&mut w, FOR_ALL);
        step(&mut w, "No");
        match step(&mut w, SEND_NOW) {
            StepResult::Completed(q) => {
                assert!(q.answer_options.is_empty());
                assert!(q.optional);
                assert_eq!(q.send_at, now());
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn options_preserve_order_and_duplicates() {
        let mut w = Wizard::new();
        step(&mut w, "Pick");
        step(&mut w, " B ; A ;B ");
        step(&mut w, FOR_ALL);
        step(&mut w, "yes");
        match step(&mut w, SEND_NOW) {
            StepResult::Completed(q) => assert_eq!(q.answer_options, vec!["B", "A", "B"]),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn targeting_resolves_handles_and_roles() {
        let mut w = Wizard::new();
        step(&mut w, "Q");
        step(&mut w, FREE_FORM);
        match step(&mut w, "@alice; qa; @ghost") {
            StepResult::Prompt { notices } => {
                assert_eq!(notices, vec!["@ghost is not registered"]);
            }
            other => panic!("expected prompt, got {other:?}"),
        }
        // unresolved handle does not abort the wizard
        assert_eq!(w.state(), WizardState::Required);
        step(&mut w, "Yes");
        match step(&mut w, SEND_NOW) {
            StepResult::Completed(q) => {
                assert!(!q.for_all);
                assert_eq!(q.users_for, vec![1]);
                assert_eq!(q.roles_for, vec!["qa"]);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn back_edges_walk_the_chain() {
        let mut w = Wizard::new();
        step(&mut w, "Q");
        step(&mut w, FREE_FORM);
        step(&mut w, FOR_ALL);
        step(&mut w, "Yes");
        assert_eq!(w.state(), WizardState::Schedule);
        step(&mut w, BACK);
        assert_eq!(w.state(), WizardState::Required);
        step(&mut w, BACK);
        assert_eq!(w.state(), WizardState::Targeting);
        step(&mut w, BACK);
        assert_eq!(w.state(), WizardState::Options);
        step(&mut w, BACK);
        assert_eq!(w.state(), WizardState::Text);
    }

    #[test]
    fn cancel_from_every_state() {
        for inputs in [
            vec![],
            vec!["Q"],
            vec!["Q", FREE_FORM],
            vec!["Q", FREE_FORM, FOR_ALL],
            vec!["Q", FREE_FORM, FOR_ALL, "Yes"],
        ] {
            let mut w = Wizard::new();
            for input in inputs {
                step(&mut w, input);
            }
            assert!(matches!(step(&mut w, CANCEL), StepResult::Cancelled));
        }
    }

    #[test]
    fn required_step_reprompts_on_junk() {
        let mut w = Wizard::new();
        step(&mut w, "Q");
        step(&mut w, FREE_FORM);
        step(&mut w, FOR_ALL);
        match step(&mut w, "perhaps") {
            StepResult::Prompt { notices } => assert!(!notices.is_empty()),
            other => panic!("expected re-prompt, got {other:?}"),
        }
        assert_eq!(w.state(), WizardState::Required);
    }

    #[test]
    fn malformed_schedule_keeps_draft() {
        let mut w = Wizard::new();
        step(&mut w, "Q");
        step(&mut w, "A; B");
        step(&mut w, FOR_ALL);
        step(&mut w, "Yes");
        match step(&mut w, "next tuesday") {
            StepResult::Prompt { notices } => assert!(!notices.is_empty()),
            other => panic!("expected re-prompt, got {other:?}"),
        }
        assert_eq!(w.state(), WizardState::Schedule);
        // prior answers survive the re-prompt
        match step(&mut w, "01.01.2025 09:00") {
            StepResult::Completed(q) => {
                assert_eq!(q.text, "Q");
                assert_eq!(q.answer_options, vec!["A", "B"]);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn buttons_include_navigation() {
        assert_eq!(WizardState::Text.buttons(), vec![CANCEL]);
        let schedule = WizardState::Schedule.buttons();
        assert!(schedule.contains(&SEND_NOW.to_string()));
        assert!(schedule.contains(&BACK.to_string()));
        assert!(schedule.contains(&CANCEL.to_string()));
    }
}
