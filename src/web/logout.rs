use crate::session::{end_session, flash};
use crate::web::redirect_to;
use actix_session::Session;
use actix_web::{get, Error, HttpResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[get("/logout")]
async fn view_logout(session: Session) -> Result<HttpResponse, Error> {
    end_session(&session);
    flash(&session, "Logged out.");
    Ok(redirect_to("/"))
}
