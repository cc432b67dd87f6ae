use std::collections::BTreeSet;

use crate::database::models::{Question, User};

/// Resolves the concrete recipient set for a question against the current
/// roster. Pure, and recomputed on every delivery tick rather than cached:
/// role membership can change between ticks.
pub fn resolve_audience(question: &Question, roster: &[User]) -> BTreeSet<i64> {
    if question.for_all {
        return roster.iter().map(|u| u.tg_user_id).collect();
    }

    let roles_for = question.roles_for();
    let mut audience: BTreeSet<i64> = question.users_for().into_iter().collect();
    for user in roster {
        if user.role_names().iter().any(|r| roles_for.contains(r)) {
            audience.insert(user.tg_user_id);
        }
    }
    audience
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, roles: &str) -> User {
        User {
            tg_user_id: id,
            username: None,
            display_name: format!("user{id}"),
            roles_json: roles.to_string(),
            admin: false,
            answered_last_question: true,
            reminder_count: 0,
        }
    }

    fn question(for_all: bool, roles_for: &str, users_for: &str) -> Question {
        Question {
            id: 1,
            text: "Q".to_string(),
            for_all,
            roles_for_json: roles_for.to_string(),
            users_for_json: users_for.to_string(),
            answer_options_json: "[]".to_string(),
            optional: false,
            send_at: "2024-03-01T00:00:00Z".to_string(),
            sent: false,
            sent_to_json: "[]".to_string(),
        }
    }

    #[test]
    fn for_all_returns_whole_roster() {
        let roster = vec![user(1, "[]"), user(2, r#"["qa"]"#), user(3, "[]")];
        let q = question(true, "[]", "[]");
        assert_eq!(resolve_audience(&q, &roster), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn union_of_users_and_role_members() {
        let roster = vec![user(1, r#"["qa"]"#), user(2, r#"["dev"]"#), user(3, "[]")];
        let q = question(false, r#"["qa"]"#, "[3]");
        assert_eq!(resolve_audience(&q, &roster), BTreeSet::from([1, 3]));
    }

    #[test]
    fn explicit_user_also_in_role_counted_once() {
        let roster = vec![user(1, r#"["qa"]"#)];
        let q = question(false, r#"["qa"]"#, "[1]");
        assert_eq!(resolve_audience(&q, &roster), BTreeSet::from([1]));
    }

    #[test]
    fn empty_targeting_is_empty_audience() {
        let roster = vec![user(1, "[]")];
        let q = question(false, "[]", "[]");
        assert!(resolve_audience(&q, &roster).is_empty());
    }
}
