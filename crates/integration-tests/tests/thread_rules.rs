mod support;

use std::sync::Arc;

use domains::{Authored, DomainError, ReplyPatch, ThreadPatch};
use support::Harness;

#[tokio::test]
async fn members_post_and_outsiders_are_turned_away() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;

    let thread = h.thread(&ana, &forum, "Sicilian").await;
    assert_eq!(thread.created_by, ana.user_id);
    assert_eq!(thread.forum_id, forum.id);

    let err = h
        .services
        .threads
        .create_thread(&bo, &forum.id.to_string(), "hi".into(), "there".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotMember));
}

#[tokio::test]
async fn unparsable_ids_resolve_as_not_found() {
    let h = Harness::new();
    let ana = h.user("Ana").await;

    let err = h
        .services
        .threads
        .create_thread(&ana, "abc", "t".into(), "x".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("forum")));

    let err = h.services.threads.thread_detail("12x").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("thread")));

    let err = h.services.threads.vote_reply(&ana, "", true).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("reply")));
}

#[tokio::test]
async fn voting_twice_keeps_one_row_with_the_latest_value() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let forum = h.forum(&ana, "Chess Club").await;
    let thread = h.thread(&ana, &forum, "Sicilian").await;
    let id = thread.id.to_string();

    let up = h.services.threads.vote_thread(&ana, &id, true).await.unwrap();
    let down = h.services.threads.vote_thread(&ana, &id, false).await.unwrap();

    assert_eq!(up.id, down.id);
    assert_eq!(h.store.thread_vote_rows(thread.id, ana.user_id).await, 1);
    let detail = h.services.threads.thread_detail(&id).await.unwrap();
    assert_eq!(detail.votes.total_upvotes, 0);
    assert_eq!(detail.votes.total_downvotes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_votes_produce_a_single_row() {
    let h = Arc::new(Harness::new());
    let ana = h.user("Ana").await;
    let forum = h.forum(&ana, "Chess Club").await;
    let thread = h.thread(&ana, &forum, "Sicilian").await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let h = Arc::clone(&h);
        let ana = ana.clone();
        let id = thread.id.to_string();
        tasks.push(tokio::spawn(async move {
            h.services.threads.vote_thread(&ana, &id, i % 2 == 0).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.store.thread_vote_rows(thread.id, ana.user_id).await, 1);
}

#[tokio::test]
async fn vote_aggregates_follow_the_latest_vote() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let thread = h.thread(&ana, &forum, "Sicilian").await;
    let id = thread.id.to_string();

    h.services.threads.vote_thread(&bo, &id, true).await.unwrap();
    let detail = h.services.threads.thread_detail(&id).await.unwrap();
    assert_eq!((detail.votes.total_upvotes, detail.votes.total_downvotes), (1, 0));

    h.services.threads.vote_thread(&bo, &id, false).await.unwrap();
    let detail = h.services.threads.thread_detail(&id).await.unwrap();
    assert_eq!((detail.votes.total_upvotes, detail.votes.total_downvotes), (0, 1));
    assert_eq!(detail.created_by, "Ana");
}

#[tokio::test]
async fn non_members_cannot_vote() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;
    let thread = h.thread(&ana, &forum, "Sicilian").await;

    let err = h
        .services
        .threads
        .vote_thread(&bo, &thread.id.to_string(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotMember));
    assert_eq!(h.store.thread_vote_rows(thread.id, bo.user_id).await, 0);
}

#[tokio::test]
async fn only_the_creator_edits_and_rejected_edits_change_nothing() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let thread = h.thread(&ana, &forum, "Sicilian").await;
    let id = thread.id.to_string();

    let err = h
        .services
        .threads
        .edit_thread(
            &bo,
            &id,
            ThreadPatch {
                title: Some("defaced".into()),
                text: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotCreator(Authored::Thread)));
    assert_eq!(err.to_string(), "user did not create the thread");
    let detail = h.services.threads.thread_detail(&id).await.unwrap();
    assert_eq!(detail.thread.title, "Sicilian");

    let edited = h
        .services
        .threads
        .edit_thread(
            &ana,
            &id,
            ThreadPatch {
                title: None,
                text: Some("1. e4 c5".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "Sicilian");
    assert_eq!(edited.text, "1. e4 c5");
}

#[tokio::test]
async fn thread_deletion_is_for_moderators_only() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let thread = h.thread(&bo, &forum, "Bo's thread").await;
    let id = thread.id.to_string();

    // Authorship is not enough.
    let err = h.services.threads.delete_thread(&bo, &id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotModerator));

    h.services.threads.delete_thread(&ana, &id).await.unwrap();
    let err = h.services.threads.thread_detail(&id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("thread")));
    assert!(h.services.threads.list_my_threads(&bo).await.unwrap().is_empty());
}

#[tokio::test]
async fn replies_follow_the_thread_rules() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let cy = h.user("Cy").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let thread = h.thread(&ana, &forum, "Sicilian").await;
    let thread_id = thread.id.to_string();

    let err = h
        .services
        .threads
        .create_reply(&cy, &thread_id, "me too".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotMember));

    let reply = h
        .services
        .threads
        .create_reply(&bo, &thread_id, "Najdorf".into())
        .await
        .unwrap();
    let reply_id = reply.id.to_string();

    let err = h
        .services
        .threads
        .edit_reply(&ana, &reply_id, ReplyPatch { text: Some("x".into()) })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotCreator(Authored::Reply)));

    h.services.threads.vote_reply(&ana, &reply_id, true).await.unwrap();
    h.services.threads.vote_reply(&bo, &reply_id, false).await.unwrap();
    let detail = h.services.threads.thread_detail(&thread_id).await.unwrap();
    assert_eq!(detail.total_replies, 1);
    assert_eq!(detail.reply[0].created_by, "Bo");
    assert_eq!(detail.reply[0].votes.total_upvotes, 1);
    assert_eq!(detail.reply[0].votes.total_downvotes, 1);

    let mine = h.services.threads.list_my_replies(&bo).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].thread.id, thread.id);
    assert_eq!(mine[0].forum_name, "Chess Club");

    let err = h.services.threads.delete_reply(&bo, &reply_id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotModerator));
    h.services.threads.delete_reply(&ana, &reply_id).await.unwrap();

    let detail = h.services.threads.thread_detail(&thread_id).await.unwrap();
    assert_eq!(detail.total_replies, 0);
    assert!(h.services.threads.list_my_replies(&bo).await.unwrap().is_empty());
}

#[tokio::test]
async fn children_of_a_deleted_forum_are_not_found() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let forum = h.forum(&ana, "Chess Club").await;
    let thread = h.thread(&ana, &forum, "Sicilian").await;
    let reply = h
        .services
        .threads
        .create_reply(&ana, &thread.id.to_string(), "c5".into())
        .await
        .unwrap();

    h.services.forums.delete_forum(&ana, forum.id).await.unwrap();

    let err = h
        .services
        .threads
        .thread_detail(&thread.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("thread")));
    let err = h
        .services
        .threads
        .vote_reply(&ana, &reply.id.to_string(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("reply")));
    assert!(h.services.forums.list_home_threads(&ana).await.unwrap().is_empty());
}
