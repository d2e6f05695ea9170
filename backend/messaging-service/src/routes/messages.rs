use crate::{
    error::AppError,
    middleware::AuthenticatedUser,
    models::NewMessage,
    services::message_store::DEFAULT_PAGE_SIZE,
    state::AppState,
};
use actix_web::{get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub receiver_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub message_ids: Vec<Uuid>,
}

/// POST /messages/send
#[post("/messages/send")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let SendMessageRequest {
        content,
        receiver_id,
        listing_id,
    } = body.into_inner();

    let (Some(content), Some(receiver_id), Some(listing_id)) = (content, receiver_id, listing_id)
    else {
        return Err(AppError::BadRequest(
            "content, receiverId and listingId are required".into(),
        ));
    };

    let view = state
        .store
        .create(NewMessage {
            sender_id: user.id,
            receiver_id,
            listing_id,
            content,
            conversation_id: None,
        })
        .await?;

    state.gateway.publish_new_message(&view).await;

    Ok(HttpResponse::Created().json(view))
}

/// GET /messages/conversations
#[get("/messages/conversations")]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let conversations = state.store.list_conversations_for_user(user.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// GET /messages/conversations/{conversation_id}/messages?page&limit
#[get("/messages/conversations/{conversation_id}/messages")]
pub async fn get_conversation_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = conversation_id.into_inner();

    if !state.store.is_participant(&conversation_id, user.id).await? {
        tracing::warn!(user_id = %user.id, %conversation_id, "history read refused");
        return Err(AppError::Forbidden("Access denied to conversation".into()));
    }

    let page = state
        .store
        .list_by_conversation(
            &conversation_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    let pagination = Pagination {
        page: page.page,
        limit: page.page_size,
        total: page.total,
        total_pages: page.total_pages(),
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "messages": page.messages,
        "pagination": pagination,
    })))
}

/// PATCH /messages/mark-read
#[patch("/messages/mark-read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<MarkReadRequest>,
) -> Result<HttpResponse, AppError> {
    let marked = state.store.mark_read(&body.message_ids, user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "markedCount": marked })))
}

/// GET /messages/unread-count
#[get("/messages/unread-count")]
pub async fn unread_count(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let count = state.store.unread_count(user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unreadCount": count })))
}
