use actix_web::web::{Data, Json, Path, ServiceConfig};
use actix_web::{web, Error, HttpResponse, Result};
use chrono::offset::Utc;

use crate::model::*;
use crate::operations::*;

const HEALTH_PATH: &str = "/health";
const POLLS_PATH: &str = "/api/polls";
const POLL_PATH: &str = "/api/polls/{poll_id}";
const VOTES_PATH: &str = "/api/polls/{poll_id}/votes";

fn client_error(reason: &ValidationError) -> Error {
    Error::from(HttpResponse::BadRequest().json(ErrorResponse {
        error: reason.to_string(),
    }))
}

async fn health_handler() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    }))
}

async fn post_poll_handler<A: 'static + PollOperations>(
    ops: Data<A>,
    body: Json<PostPollRequest>,
) -> Result<HttpResponse> {
    let Json(request) = body;
    let poll = ops.create_poll(&request).await.map_err(|e| match e {
        CreatePollError::Invalid(reason) => client_error(&reason),
        CreatePollError::Conflict => Error::from(HttpResponse::Conflict()),
        CreatePollError::Store(_) => Error::from(HttpResponse::InternalServerError()),
    })?;
    Ok(HttpResponse::Created().json(poll))
}

async fn get_poll_handler<A: 'static + PollOperations>(
    ops: Data<A>,
    path: Path<String>,
) -> Result<Json<GetPollResponse>> {
    let poll = ops.get_poll(&path).await.map_err(|e| match e {
        GetPollError::NotFound => Error::from(HttpResponse::NotFound()),
        GetPollError::Store(_) => Error::from(HttpResponse::InternalServerError()),
    })?;
    Ok(Json(poll))
}

async fn put_poll_handler<A: 'static + PollOperations>(
    ops: Data<A>,
    path: Path<String>,
    body: Json<PutPollRequest>,
) -> Result<Json<GetPollResponse>> {
    let Json(request) = body;
    let poll = ops.edit_poll(&path, &request).await.map_err(|e| match e {
        EditPollError::Invalid(reason) => client_error(&reason),
        EditPollError::NotFound => Error::from(HttpResponse::NotFound()),
        EditPollError::Store(_) => Error::from(HttpResponse::InternalServerError()),
    })?;
    Ok(Json(poll))
}

async fn toggle_vote_handler<A: 'static + PollOperations>(
    ops: Data<A>,
    path: Path<String>,
    body: Json<ToggleVoteRequest>,
) -> Result<Json<GetPollResponse>> {
    let Json(request) = body;
    let poll = ops.toggle_vote(&path, &request).await.map_err(|e| match e {
        ToggleVoteError::Invalid(reason) => client_error(&reason),
        ToggleVoteError::NotFound => Error::from(HttpResponse::NotFound()),
        ToggleVoteError::Store(_) => Error::from(HttpResponse::InternalServerError()),
    })?;
    Ok(Json(poll))
}

async fn list_polls_handler<A: 'static + PollOperations>(
    ops: Data<A>,
) -> Result<Json<Vec<PollSummary>>> {
    let polls = ops.list_polls().await.map_err(|e| match e {
        ListPollsError::Store(_) => Error::from(HttpResponse::InternalServerError()),
    })?;
    Ok(Json(polls))
}

pub fn config<A: 'static + PollOperations>(cfg: &mut ServiceConfig) {
    cfg.route(HEALTH_PATH, web::get().to(health_handler))
        .service(
            web::resource(POLLS_PATH)
                .route(web::post().to(post_poll_handler::<A>))
                .route(web::get().to(list_polls_handler::<A>)),
        )
        .service(
            web::resource(POLL_PATH)
                .route(web::get().to(get_poll_handler::<A>))
                .route(web::put().to(put_poll_handler::<A>)),
        )
        .route(VOTES_PATH, web::post().to(toggle_vote_handler::<A>));
}
