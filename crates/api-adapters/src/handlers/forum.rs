use axum::extract::State;
use domains::{Forum, ForumDetail, ForumSearchHit, HomeThread, Membership};

use crate::dto::{
    CreateForumRequest, EditForumRequest, ForumIdQuery, ForumIdRequest, RemoveMemberRequest,
    SearchQuery,
};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, AuthActor};
use crate::handlers::respond;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<CreateForumRequest>,
) -> ApiResult<Forum> {
    let result = match req.validate() {
        Ok(new_forum) => state.services.forums.create_forum(&actor, new_forum).await,
        Err(err) => Err(err),
    };
    respond(&state, "create_forum", result)
}

pub async fn join(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ForumIdRequest>,
) -> ApiResult<Membership> {
    let result = match req.forum_id.parse("forum_id") {
        Ok(forum_id) => state.services.forums.join_forum(&actor, forum_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "join_forum", result)
}

pub async fn edit(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<EditForumRequest>,
) -> ApiResult<Forum> {
    let result = match req.validate() {
        Ok((forum_id, patch)) => state.services.forums.edit_forum(&actor, forum_id, patch).await,
        Err(err) => Err(err),
    };
    respond(&state, "edit_forum", result)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ForumIdRequest>,
) -> ApiResult<()> {
    let result = match req.forum_id.parse("forum_id") {
        Ok(forum_id) => state.services.forums.delete_forum(&actor, forum_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "delete_forum", result)
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<Forum>> {
    let result = state.services.forums.list_my_forums(&actor).await;
    respond(&state, "list_my_forums", result)
}

pub async fn discover(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<Forum>> {
    let result = state.services.forums.discover_forums(&actor).await;
    respond(&state, "discover_forums", result)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiQuery(query): ApiQuery<ForumIdQuery>,
) -> ApiResult<ForumDetail> {
    let result = match query.validate() {
        Ok(forum_id) => state.services.forums.forum_detail(&actor, forum_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "forum_detail", result)
}

pub async fn home_threads(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<HomeThread>> {
    let result = state.services.forums.list_home_threads(&actor).await;
    respond(&state, "list_home_threads", result)
}

pub async fn check_moderator(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiQuery(query): ApiQuery<ForumIdQuery>,
) -> ApiResult<bool> {
    let result = match query.validate() {
        Ok(forum_id) => state.services.forums.check_moderator(&actor, forum_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "check_moderator", result)
}

pub async fn remove_member(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<RemoveMemberRequest>,
) -> ApiResult<()> {
    let result = match req.validate() {
        Ok((forum_id, user_id)) => {
            state.services.forums.remove_member(&actor, forum_id, user_id).await
        }
        Err(err) => Err(err),
    };
    respond(&state, "remove_member", result)
}

pub async fn search(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<ForumSearchHit>> {
    let result = state.services.forums.search_forums(query.into()).await;
    respond(&state, "search_forums", result)
}
