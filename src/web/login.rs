use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::session::{flash, start_session};
use crate::user::{find_user_by_name, verify_password};
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_login).service(post_login);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
}

#[derive(Deserialize)]
pub struct FormData {
    username: String,
    password: String,
}

#[get("/login")]
async fn view_login(client: ClientCtx) -> impl Responder {
    LoginTemplate { client }.to_response()
}

#[post("/login")]
async fn post_login(session: Session, form: web::Form<FormData>) -> Result<HttpResponse, Error> {
    let user = find_user_by_name(get_db_pool(), form.username.trim())
        .await
        .map_err(error::ErrorInternalServerError)?;

    match user {
        Some(user) if verify_password(&user.password, &form.password) => {
            start_session(&session, user.id);
            flash(&session, "Logged in successfully.");
            Ok(redirect_to("/"))
        }
        // Same notice for a missing user and a bad password.
        _ => {
            flash(&session, "Invalid username or password.");
            Ok(redirect_to("/login"))
        }
    }
}
