#![allow(clippy::unwrap_used)]

mod common;

use chrono::{Duration, Utc};
use common::{setup_repo, RecordingMessenger};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use survey_bot::database::models::NewQuestion;
use survey_bot::database::repository::Repository;
use survey_bot::services::collector::AnswerCollector;
use survey_bot::services::scheduler::DeliveryService;

// Long enough that no reminder timer fires while a test runs.
const QUIET: StdDuration = StdDuration::from_secs(3600);

fn service(repo: &Repository, messenger: &Arc<RecordingMessenger>) -> DeliveryService {
    let mock: Arc<RecordingMessenger> = Arc::clone(messenger);
    let collector = Arc::new(AnswerCollector::new(repo.clone(), mock, QUIET));
    DeliveryService::new(repo.clone(), collector, StdDuration::from_secs(10))
}

fn broadcast(text: &str) -> NewQuestion {
    NewQuestion {
        text: text.to_string(),
        for_all: true,
        roles_for: vec![],
        users_for: vec![],
        answer_options: vec![],
        optional: false,
        send_at: Utc::now() - Duration::minutes(1),
    }
}

#[tokio::test]
async fn broadcast_reaches_everyone_in_one_tick() {
    let (repo, _dir) = setup_repo(&[]).await;
    for id in [1, 2, 3] {
        repo.create_user(id, None, "user").await.unwrap();
    }
    let q = repo.create_question(&broadcast("Ready?")).await.unwrap();

    let messenger = Arc::new(RecordingMessenger::new());
    service(&repo, &messenger).tick(Utc::now()).await.unwrap();

    let q = repo.get_question(q.id).await.unwrap();
    assert!(q.sent);
    assert_eq!(q.sent_to(), vec![1, 2, 3]);
    for id in [1, 2, 3] {
        assert_eq!(messenger.prompts_to(id).len(), 1);
        assert!(!repo.get_user(id).await.unwrap().answered_last_question);
    }
}

#[tokio::test]
async fn nothing_happens_without_a_due_question() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, None, "user").await.unwrap();
    let mut future = broadcast("later");
    future.send_at = Utc::now() + Duration::hours(2);
    repo.create_question(&future).await.unwrap();

    let messenger = Arc::new(RecordingMessenger::new());
    service(&repo, &messenger).tick(Utc::now()).await.unwrap();

    assert!(messenger.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn busy_recipient_is_skipped_then_retried() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, None, "free").await.unwrap();
    repo.create_user(2, None, "busy").await.unwrap();
    // user 2 is mid-answer on some earlier question
    repo.update_user_answer_state(2, false, 0).await.unwrap();

    let q = repo.create_question(&broadcast("Ready?")).await.unwrap();
    let messenger = Arc::new(RecordingMessenger::new());
    let delivery = service(&repo, &messenger);

    delivery.tick(Utc::now()).await.unwrap();
    let after_first = repo.get_question(q.id).await.unwrap();
    assert!(!after_first.sent);
    assert_eq!(after_first.sent_to(), vec![1]);
    assert!(messenger.prompts_to(2).is_empty());

    // the busy user answers their earlier question, freeing them up
    repo.update_user_answer_state(2, true, 0).await.unwrap();
    delivery.tick(Utc::now()).await.unwrap();

    let after_second = repo.get_question(q.id).await.unwrap();
    assert!(after_second.sent);
    assert_eq!(after_second.sent_to(), vec![1, 2]);
    // monotone: the first recipient was not re-notified
    assert_eq!(messenger.prompts_to(1).len(), 1);
    assert_eq!(messenger.prompts_to(2).len(), 1);
}

#[tokio::test]
async fn transport_failure_skips_recipient_for_the_tick() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, None, "ok").await.unwrap();
    repo.create_user(2, None, "down").await.unwrap();

    let q = repo.create_question(&broadcast("Ready?")).await.unwrap();
    let messenger = Arc::new(RecordingMessenger::new());
    messenger.fail_recipient(2);
    let delivery = service(&repo, &messenger);

    delivery.tick(Utc::now()).await.unwrap();
    let after_first = repo.get_question(q.id).await.unwrap();
    assert!(!after_first.sent);
    assert_eq!(after_first.sent_to(), vec![1]);
    // the failed recipient keeps a clean answer state
    assert!(repo.get_user(2).await.unwrap().answered_last_question);

    messenger.restore_recipient(2);
    delivery.tick(Utc::now()).await.unwrap();
    let after_second = repo.get_question(q.id).await.unwrap();
    assert!(after_second.sent);
    assert_eq!(after_second.sent_to(), vec![1, 2]);
}

#[tokio::test]
async fn restart_resumes_without_renotifying() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, None, "a").await.unwrap();
    repo.create_user(2, None, "b").await.unwrap();

    let q = repo.create_question(&broadcast("Ready?")).await.unwrap();
    let messenger = Arc::new(RecordingMessenger::new());
    messenger.fail_recipient(2);
    service(&repo, &messenger).tick(Utc::now()).await.unwrap();
    assert_eq!(repo.get_question(q.id).await.unwrap().sent_to(), vec![1]);

    // fresh service instances, as after a process restart
    messenger.restore_recipient(2);
    service(&repo, &messenger).tick(Utc::now()).await.unwrap();

    assert!(repo.get_question(q.id).await.unwrap().sent);
    assert_eq!(messenger.prompts_to(1).len(), 1);
    assert_eq!(messenger.prompts_to(2).len(), 1);
}

#[tokio::test]
async fn role_targeted_question_reaches_members_only() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, Some("alice"), "Alice").await.unwrap();
    repo.create_user(2, Some("bob"), "Bob").await.unwrap();
    repo.create_user(3, Some("carol"), "Carol").await.unwrap();
    repo.add_role("alice", "qa").await.unwrap();

    let q = repo
        .create_question(&NewQuestion {
            text: "QA only".to_string(),
            for_all: false,
            roles_for: vec!["qa".to_string()],
            users_for: vec![3],
            answer_options: vec![],
            optional: false,
            send_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let messenger = Arc::new(RecordingMessenger::new());
    service(&repo, &messenger).tick(Utc::now()).await.unwrap();

    let q = repo.get_question(q.id).await.unwrap();
    assert!(q.sent);
    assert_eq!(q.sent_to(), vec![1, 3]);
    assert!(messenger.prompts_to(2).is_empty());
}

#[tokio::test]
async fn earlier_question_delivered_before_later_one() {
    let (repo, _dir) = setup_repo(&[]).await;
    repo.create_user(1, None, "user").await.unwrap();

    let mut first = broadcast("first");
    first.send_at = Utc::now() - Duration::minutes(30);
    let first = repo.create_question(&first).await.unwrap();
    let second = repo.create_question(&broadcast("second")).await.unwrap();

    let messenger = Arc::new(RecordingMessenger::new());
    let delivery = service(&repo, &messenger);

    delivery.tick(Utc::now()).await.unwrap();
    assert!(repo.get_question(first.id).await.unwrap().sent);
    assert!(!repo.get_question(second.id).await.unwrap().sent);
    assert_eq!(messenger.prompts_to(1)[0].text, "first");

    // the second question waits until the recipient is free again
    repo.update_user_answer_state(1, true, 0).await.unwrap();
    delivery.tick(Utc::now()).await.unwrap();
    assert!(repo.get_question(second.id).await.unwrap().sent);
}
