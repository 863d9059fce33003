use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session::flash;
use crate::user::{find_user_by_name, hash_password};
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_user_get).service(create_user_post);
}

#[derive(Template)]
#[template(path = "create_user.html")]
pub struct CreateUserTemplate {
    pub client: ClientCtx,
}

#[derive(Deserialize)]
pub struct FormData {
    username: String,
    password: String,
}

#[get("/register")]
async fn create_user_get(client: ClientCtx) -> impl Responder {
    CreateUserTemplate { client }.to_response()
}

#[post("/register")]
async fn create_user_post(
    session: Session,
    form: web::Form<FormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let name = form.username.trim();

    if name.is_empty() || form.password.is_empty() {
        flash(&session, "Username and password are required.");
        return Ok(redirect_to("/register"));
    }

    // Best-effort pre-check; the unique constraint on users.name is what
    // actually decides a registration race.
    let taken = find_user_by_name(db, name)
        .await
        .map_err(error::ErrorInternalServerError)?
        .is_some();
    if taken {
        flash(&session, "That username is already taken.");
        return Ok(redirect_to("/register"));
    }

    let password = hash_password(&form.password).map_err(error::ErrorInternalServerError)?;
    let user = users::ActiveModel {
        name: Set(name.to_owned()),
        password: Set(password),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    match users::Entity::insert(user).exec(db).await {
        Ok(_) => {
            flash(&session, "Registration successful, please log in.");
            Ok(redirect_to("/login"))
        }
        Err(e) => {
            // A racing duplicate lands here via the constraint.
            log::warn!("create_user_post: {}", e);
            flash(&session, "That username is already taken.");
            Ok(redirect_to("/register"))
        }
    }
}
