mod support;

use domains::{DomainError, ForumPatch, ForumSearch, ModeratorRank, NewForum, Role};
use support::Harness;

#[tokio::test]
async fn creating_a_forum_makes_the_creator_head_moderator_and_member() {
    let h = Harness::new();
    let ana = h.user("Ana").await;

    let forum = h.forum(&ana, "Chess Club").await;

    let moderators = h.store.moderators_of(forum.id).await;
    assert_eq!(moderators.len(), 1);
    assert_eq!(moderators[0].user_id, ana.user_id);
    assert_eq!(moderators[0].rank, ModeratorRank::Head);
    assert_eq!(moderators[0].nickname.as_deref(), Some("Ana"));

    let memberships = h.store.memberships_of(forum.id).await;
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].user_id, ana.user_id);
    assert!(!memberships[0].is_removed);
    assert_eq!(h.store.forum_count().await, 1);
}

#[tokio::test]
async fn duplicate_forum_name_is_rejected_without_side_effects() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    h.forum(&ana, "Chess Club").await;

    let err = h
        .services
        .forums
        .create_forum(
            &bo,
            NewForum {
                name: "Chess Club".into(),
                introduction: String::new(),
                category: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::AlreadyExists(_)));
    assert_eq!(err.to_string(), "forum name already exists");
    assert_eq!(h.store.forum_count().await, 1);
}

#[tokio::test]
async fn failed_moderator_insert_rolls_back_the_whole_forum() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    h.store.reject_inserts_into("moderators").await;

    let err = h
        .services
        .forums
        .create_forum(
            &ana,
            NewForum {
                name: "Chess Club".into(),
                introduction: "64 squares".into(),
                category: Some("games".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)));

    h.store.accept_all_inserts().await;
    assert_eq!(h.store.forum_count().await, 0);
    let hits = h
        .services
        .forums
        .search_forums(ForumSearch {
            name: Some("chess".into()),
            category: None,
        })
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert!(h.services.forums.discover_forums(&bo).await.unwrap().is_empty());

    let forum = h.forum(&ana, "Chess Club").await;
    assert_eq!(h.store.moderators_of(forum.id).await.len(), 1);
    assert_eq!(h.store.memberships_of(forum.id).await.len(), 1);
}

#[tokio::test]
async fn failed_membership_insert_leaves_no_moderator_behind() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    h.store.reject_inserts_into("user_forums").await;

    let err = h
        .services
        .forums
        .create_forum(
            &ana,
            NewForum {
                name: "Go Club".into(),
                introduction: String::new(),
                category: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)));

    h.store.accept_all_inserts().await;
    assert_eq!(h.store.forum_count().await, 0);
    assert!(h.services.forums.list_my_forums(&ana).await.unwrap().is_empty());

    let forum = h.forum(&ana, "Go Club").await;
    assert_eq!(h.store.moderators_of(forum.id).await.len(), 1);
}

#[tokio::test]
async fn admins_may_not_create_forums() {
    let h = Harness::new();
    let admin = h.account("Root", Role::Admin).await;

    let err = h
        .services
        .forums
        .create_forum(
            &admin,
            NewForum {
                name: "Staff".into(),
                introduction: String::new(),
                category: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::RoleNotAuthorized));
    assert_eq!(h.store.forum_count().await, 0);
}

#[tokio::test]
async fn joining_twice_reports_already_member() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;

    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let err = h.services.forums.join_forum(&bo, forum.id).await.unwrap_err();

    assert!(matches!(err, DomainError::AlreadyMember));
    let active = h
        .store
        .memberships_of(forum.id)
        .await
        .into_iter()
        .filter(|m| m.user_id == bo.user_id && !m.is_removed)
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn joining_a_missing_forum_is_not_found() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let err = h.services.forums.join_forum(&ana, 999).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("forum")));
}

#[tokio::test]
async fn only_moderators_delete_and_deleted_forums_disappear() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();

    let err = h.services.forums.delete_forum(&bo, forum.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotModerator));
    assert!(h.services.forums.forum_detail(&bo, forum.id).await.is_ok());

    h.services.forums.delete_forum(&ana, forum.id).await.unwrap();
    let err = h.services.forums.forum_detail(&ana, forum.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound("forum")));
    assert!(h.services.forums.list_my_forums(&bo).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_forum_name_can_be_reused() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.delete_forum(&ana, forum.id).await.unwrap();

    let again = h.forum(&ana, "Chess Club").await;
    assert_ne!(again.id, forum.id);
}

#[tokio::test]
async fn moderator_edits_and_rename_collisions_are_rejected() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let chess = h.forum(&ana, "Chess Club").await;
    h.forum(&bo, "Go Club").await;

    let err = h
        .services
        .forums
        .edit_forum(
            &bo,
            chess.id,
            ForumPatch {
                introduction: Some("hijacked".into()),
                ..ForumPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotModerator));

    let err = h
        .services
        .forums
        .edit_forum(
            &ana,
            chess.id,
            ForumPatch {
                name: Some("Go Club".into()),
                ..ForumPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyExists(_)));

    let edited = h
        .services
        .forums
        .edit_forum(
            &ana,
            chess.id,
            ForumPatch {
                name: Some("Chess Club".into()),
                introduction: Some("openings and endgames".into()),
                ..ForumPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.name, "Chess Club");
    assert_eq!(edited.introduction, "openings and endgames");
}

#[tokio::test]
async fn removing_a_member_requires_moderator_then_membership() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let cy = h.user("Cy").await;
    let forum = h.forum(&ana, "Chess Club").await;
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();

    let err = h
        .services
        .forums
        .remove_member(&bo, forum.id, ana.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotModerator));

    let err = h
        .services
        .forums
        .remove_member(&ana, forum.id, cy.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotMember));

    h.services
        .forums
        .remove_member(&ana, forum.id, bo.user_id)
        .await
        .unwrap();
    let err = h
        .services
        .threads
        .create_thread(&bo, &forum.id.to_string(), "hi".into(), "there".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotMember));

    // A removed member may join again.
    h.services.forums.join_forum(&bo, forum.id).await.unwrap();
    let detail = h.services.forums.forum_detail(&bo, forum.id).await.unwrap();
    assert!(detail.is_member);
    assert_eq!(detail.number_of_members, 2);
}

#[tokio::test]
async fn check_moderator_reports_rank_insensitive_status() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let forum = h.forum(&ana, "Chess Club").await;

    assert!(h.services.forums.check_moderator(&ana, forum.id).await.unwrap());
    assert!(matches!(
        h.services.forums.check_moderator(&bo, forum.id).await,
        Err(DomainError::NotModerator)
    ));
    assert!(matches!(
        h.services.forums.check_moderator(&ana, 424242).await,
        Err(DomainError::NotFound("forum"))
    ));
}

#[tokio::test]
async fn listing_discovery_detail_and_search() {
    let h = Harness::new();
    let ana = h.user("Ana").await;
    let bo = h.user("Bo").await;
    let chess = h.forum(&ana, "Chess Club").await;
    let go = h.forum(&bo, "Go Club").await;
    h.thread(&ana, &chess, "Sicilian").await;
    h.thread(&ana, &chess, "French").await;

    let mine: Vec<_> = h
        .services
        .forums
        .list_my_forums(&ana)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(mine, vec![chess.id]);

    let discover: Vec<_> = h
        .services
        .forums
        .discover_forums(&ana)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(discover, vec![go.id]);

    let detail = h.services.forums.forum_detail(&bo, chess.id).await.unwrap();
    assert_eq!(detail.total_threads, 2);
    assert_eq!(detail.threads[0].title, "French");
    assert_eq!(detail.threads[0].created_by, "Ana");
    assert_eq!(detail.number_of_members, 1);
    assert!(!detail.is_member);

    let home = h.services.forums.list_home_threads(&ana).await.unwrap();
    assert_eq!(home.len(), 2);
    assert_eq!(home[0].forum_name, "Chess Club");

    let hits = h
        .services
        .forums
        .search_forums(ForumSearch {
            name: Some("club".into()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);

    let hits = h
        .services
        .forums
        .search_forums(ForumSearch {
            name: Some("CHESS".into()),
            category: Some("hob".into()),
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, chess.id);
}
