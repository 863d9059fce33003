pub mod account;
pub mod create_user;
pub mod error;
pub mod index;
pub mod login;
pub mod logout;
pub mod message;
pub mod subject;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    index::configure(conf);
    create_user::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    account::configure(conf);
    subject::configure(conf);
    message::configure(conf);
}

/// See-other style redirect used by every POST handler and by the
/// recoverable failure paths (flash notice + bounce).
pub(crate) fn redirect_to(location: &str) -> actix_web::HttpResponse {
    actix_web::HttpResponse::Found()
        .append_header(("Location", location.to_owned()))
        .finish()
}
