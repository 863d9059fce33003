use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{messages, subjects};
use crate::session::flash;
use crate::tree::{build_reply_forest, flatten_forest, MessageRow};
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // The literal /subjects/create route must land before /subjects/{id}.
    conf.service(view_create_subject)
        .service(create_subject)
        .service(view_subject)
        .service(create_reply);
}

#[derive(Template)]
#[template(path = "subject_create.html")]
pub struct SubjectCreateTemplate {
    pub client: ClientCtx,
}

#[derive(Template)]
#[template(path = "subject.html")]
pub struct SubjectTemplate {
    pub client: ClientCtx,
    pub subject: subjects::Model,
    pub messages: Vec<MessageRow>,
}

#[derive(Deserialize)]
pub struct NewSubjectFormData {
    title: String,
    content: String,
}

#[derive(Deserialize)]
pub struct NewMessageFormData {
    content: String,
    /// Arrives as a string so an empty field (top-level post) deserializes.
    parent_id: Option<String>,
}

#[get("/subjects/create")]
async fn view_create_subject(client: ClientCtx, session: Session) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        flash(&session, "You must be logged in to create a subject.");
        return Ok(redirect_to("/login"));
    }

    Ok(SubjectCreateTemplate { client }.to_response())
}

#[post("/subjects/create")]
async fn create_subject(
    client: ClientCtx,
    session: Session,
    form: web::Form<NewSubjectFormData>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        flash(&session, "You must be logged in to create a subject.");
        return Ok(redirect_to("/login"));
    }

    let title = form.title.trim();
    let content = form.content.trim();
    if title.is_empty() || content.is_empty() {
        flash(&session, "Title and content are required.");
        return Ok(redirect_to("/subjects/create"));
    }

    let subject = subjects::ActiveModel {
        title: Set(title.to_owned()),
        content: Set(content.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let res = subjects::Entity::insert(subject)
        .exec(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    flash(&session, "Subject created.");
    Ok(redirect_to(&format!("/subjects/{}", res.last_insert_id)))
}

#[get("/subjects/{subject_id}")]
async fn view_subject(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let subject = subjects::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Subject not found."))?;

    // This query is the single place reply order is decided; the tree
    // builder keeps whatever order it is handed.
    let rows = messages::Entity::find()
        .filter(messages::Column::SubjectId.eq(subject.id))
        .order_by_asc(messages::Column::CreatedAt)
        .order_by_asc(messages::Column::Id)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let messages = flatten_forest(build_reply_forest(rows));

    Ok(SubjectTemplate {
        client,
        subject,
        messages,
    }
    .to_response())
}

#[post("/subjects/{subject_id}/post-reply")]
async fn create_reply(
    client: ClientCtx,
    session: Session,
    path: web::Path<i32>,
    form: web::Form<NewMessageFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let user_id = match client.get_id() {
        Some(id) => id,
        None => {
            flash(&session, "You must be logged in to post a message.");
            return Ok(redirect_to("/login"));
        }
    };

    let subject = match subjects::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        Some(subject) => subject,
        None => {
            flash(&session, "Subject not found.");
            return Ok(redirect_to("/"));
        }
    };

    let content = form.content.trim();
    if content.is_empty() {
        flash(&session, "A message needs some content.");
        return Ok(redirect_to(&format!("/subjects/{}", subject.id)));
    }

    // An absent, empty or unparsable field means a top-level post. A stale
    // id (the parent was deleted meanwhile) is stored as-is; the tree
    // builder renders such replies at the top level.
    let parent_id = form
        .parent_id
        .as_deref()
        .and_then(|s| s.parse::<i32>().ok());

    let message = messages::ActiveModel {
        subject_id: Set(subject.id),
        parent_id: Set(parent_id),
        user_id: Set(user_id),
        author: Set(client.get_name()),
        content: Set(content.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    messages::Entity::insert(message)
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    flash(&session, "Message posted.");
    Ok(redirect_to(&format!("/subjects/{}", subject.id)))
}
