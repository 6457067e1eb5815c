use axum::extract::State;
use domains::{Reply, Thread, ThreadDetail, UserReply, UserThread, Vote};

use crate::dto::{
    CreateReplyRequest, CreateThreadRequest, EditReplyRequest, EditThreadRequest, ReplyIdRequest,
    ReplyVoteRequest, ThreadIdQuery, ThreadIdRequest, ThreadVoteRequest,
};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, AuthActor};
use crate::handlers::respond;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<CreateThreadRequest>,
) -> ApiResult<Thread> {
    let result = match req.validate() {
        Ok(forum_id) => {
            state
                .services
                .threads
                .create_thread(&actor, &forum_id, req.title, req.text)
                .await
        }
        Err(err) => Err(err),
    };
    respond(&state, "create_thread", result)
}

pub async fn vote(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ThreadVoteRequest>,
) -> ApiResult<Vote> {
    let result = match req.thread_id.numeric("thread_id") {
        Ok(thread_id) => state.services.threads.vote_thread(&actor, thread_id, req.vote).await,
        Err(err) => Err(err),
    };
    respond(&state, "vote_thread", result)
}

pub async fn edit(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<EditThreadRequest>,
) -> ApiResult<Thread> {
    let result = match req.validate() {
        Ok((thread_id, patch)) => state.services.threads.edit_thread(&actor, &thread_id, patch).await,
        Err(err) => Err(err),
    };
    respond(&state, "edit_thread", result)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    ApiQuery(query): ApiQuery<ThreadIdQuery>,
) -> ApiResult<ThreadDetail> {
    let result = match query.validate() {
        Ok(thread_id) => state.services.threads.thread_detail(thread_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "thread_detail", result)
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<UserThread>> {
    let result = state.services.threads.list_my_threads(&actor).await;
    respond(&state, "list_my_threads", result)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ThreadIdRequest>,
) -> ApiResult<()> {
    let result = match req.thread_id.numeric("thread_id") {
        Ok(thread_id) => state.services.threads.delete_thread(&actor, thread_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "delete_thread", result)
}

pub async fn create_reply(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<CreateReplyRequest>,
) -> ApiResult<Reply> {
    let result = match req.validate() {
        Ok(thread_id) => state.services.threads.create_reply(&actor, &thread_id, req.text).await,
        Err(err) => Err(err),
    };
    respond(&state, "create_reply", result)
}

pub async fn vote_reply(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ReplyVoteRequest>,
) -> ApiResult<Vote> {
    let result = match req.reply_id.numeric("reply_id") {
        Ok(reply_id) => state.services.threads.vote_reply(&actor, reply_id, req.vote).await,
        Err(err) => Err(err),
    };
    respond(&state, "vote_reply", result)
}

pub async fn edit_reply(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<EditReplyRequest>,
) -> ApiResult<Reply> {
    let result = match req.validate() {
        Ok((reply_id, patch)) => state.services.threads.edit_reply(&actor, &reply_id, patch).await,
        Err(err) => Err(err),
    };
    respond(&state, "edit_reply", result)
}

pub async fn list_my_replies(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<UserReply>> {
    let result = state.services.threads.list_my_replies(&actor).await;
    respond(&state, "list_my_replies", result)
}

pub async fn delete_reply(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    ApiJson(req): ApiJson<ReplyIdRequest>,
) -> ApiResult<()> {
    let result = match req.reply_id.numeric("reply_id") {
        Ok(reply_id) => state.services.threads.delete_reply(&actor, reply_id).await,
        Err(err) => Err(err),
    };
    respond(&state, "delete_reply", result)
}
