use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::messages;
use crate::session::flash;
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, sea_query::Expr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(edit_message)
        .service(update_message)
        .service(destroy_message);
}

#[derive(Template)]
#[template(path = "message_edit.html")]
pub struct MessageEditTemplate {
    pub client: ClientCtx,
    pub message: messages::Model,
}

#[derive(Deserialize)]
pub struct EditFormData {
    content: String,
}

#[get("/messages/{message_id}/edit")]
async fn edit_message(
    client: ClientCtx,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        flash(&session, "You must be logged in to edit a message.");
        return Ok(redirect_to("/login"));
    }

    let message = match find_message(path.into_inner()).await? {
        Some(message) => message,
        None => {
            flash(&session, "Message not found.");
            return Ok(redirect_to("/"));
        }
    };

    if !client.can_update_message(&message) {
        flash(&session, "You can only edit your own messages.");
        return Ok(redirect_to(&format!("/subjects/{}", message.subject_id)));
    }

    Ok(MessageEditTemplate { client, message }.to_response())
}

#[post("/messages/{message_id}/edit")]
async fn update_message(
    client: ClientCtx,
    session: Session,
    path: web::Path<i32>,
    form: web::Form<EditFormData>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        flash(&session, "You must be logged in to edit a message.");
        return Ok(redirect_to("/login"));
    }

    let message = match find_message(path.into_inner()).await? {
        Some(message) => message,
        None => {
            flash(&session, "Message not found.");
            return Ok(redirect_to("/"));
        }
    };

    if !client.can_update_message(&message) {
        flash(&session, "You can only edit your own messages.");
        return Ok(redirect_to(&format!("/subjects/{}", message.subject_id)));
    }

    let content = form.content.trim();
    if content.is_empty() {
        flash(&session, "A message needs some content.");
        return Ok(redirect_to(&format!("/messages/{}/edit", message.id)));
    }

    // Content only. Everything else on the row, the author snapshot
    // included, stays as posted.
    messages::Entity::update_many()
        .col_expr(messages::Column::Content, Expr::value(content))
        .filter(messages::Column::Id.eq(message.id))
        .exec(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    flash(&session, "Message updated.");
    Ok(redirect_to(&format!("/subjects/{}", message.subject_id)))
}

#[post("/messages/{message_id}/delete")]
async fn destroy_message(
    client: ClientCtx,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    if !client.is_user() {
        flash(&session, "You must be logged in to delete a message.");
        return Ok(redirect_to("/login"));
    }

    let message = match find_message(path.into_inner()).await? {
        Some(message) => message,
        None => {
            flash(&session, "Message not found.");
            return Ok(redirect_to("/"));
        }
    };

    if !client.can_delete_message(&message) {
        flash(&session, "You can only delete your own messages.");
        return Ok(redirect_to(&format!("/subjects/{}", message.subject_id)));
    }

    // Exactly one row goes. Replies keep their now-dangling parent_id and
    // the next tree build promotes them to the top level.
    messages::Entity::delete_many()
        .filter(messages::Column::Id.eq(message.id))
        .exec(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    flash(&session, "Message deleted.");
    Ok(redirect_to(&format!("/subjects/{}", message.subject_id)))
}

async fn find_message(id: i32) -> Result<Option<messages::Model>, Error> {
    messages::Entity::find_by_id(id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)
}
