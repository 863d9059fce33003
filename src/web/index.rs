use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::subjects;
use actix_web::{error, get, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    pub subjects: Vec<subjects::Model>,
}

#[get("/")]
async fn view_index(client: ClientCtx) -> Result<impl Responder, Error> {
    let subjects = subjects::Entity::find()
        .order_by_desc(subjects::Column::CreatedAt)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(IndexTemplate { client, subjects }.to_response())
}
