use crate::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session::flash;
use crate::user::{find_user_by_name, get_profile_by_id, hash_password, Profile};
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, sea_query::Expr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_account).service(update_account);
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub client: ClientCtx,
    pub profile: Profile,
}

#[derive(Deserialize)]
pub struct UpdateFormData {
    username: String,
    password: String,
}

#[get("/account")]
async fn view_account(client: ClientCtx, session: Session) -> Result<HttpResponse, Error> {
    let id = match client.get_id() {
        Some(id) => id,
        None => {
            flash(&session, "You must be logged in to view your account.");
            return Ok(redirect_to("/login"));
        }
    };

    match get_profile_by_id(id).await {
        Some(profile) => Ok(AccountTemplate { client, profile }.to_response()),
        None => Err(error::ErrorInternalServerError("Could not load profile.")),
    }
}

#[post("/account")]
async fn update_account(
    client: ClientCtx,
    session: Session,
    form: web::Form<UpdateFormData>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let id = match client.get_id() {
        Some(id) => id,
        None => {
            flash(&session, "You must be logged in to update your account.");
            return Ok(redirect_to("/login"));
        }
    };

    let name = form.username.trim();
    if name.is_empty() {
        flash(&session, "Username is required.");
        return Ok(redirect_to("/account"));
    }

    // Reject a rename onto a name some other account already holds.
    if let Some(existing) = find_user_by_name(db, name)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        if existing.id != id {
            flash(&session, "That username is already taken.");
            return Ok(redirect_to("/account"));
        }
    }

    // Earlier messages keep their author snapshot; only the account row
    // changes on rename.
    users::Entity::update_many()
        .col_expr(users::Column::Name, Expr::value(name))
        .filter(users::Column::Id.eq(id))
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    // An empty password field means keep the current one.
    if !form.password.is_empty() {
        let password = hash_password(&form.password).map_err(error::ErrorInternalServerError)?;
        users::Entity::update_many()
            .col_expr(users::Column::Password, Expr::value(password))
            .filter(users::Column::Id.eq(id))
            .exec(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
    }

    flash(&session, "Account updated.");
    Ok(redirect_to("/account"))
}
