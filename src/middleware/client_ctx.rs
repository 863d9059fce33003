use crate::orm::messages;
use crate::session::{authenticate_by_session, take_flash};
use crate::user::ClientUser;
use actix_session::Session;
use actix_utils::future::{ok, Ready};
use actix_web::dev::{
    forward_ready, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use std::time::{Duration, Instant};
use std::{cell::RefCell, rc::Rc};

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    pub client: Option<ClientUser>,
    pub flashes: Vec<String>,
    pub request_start: Instant,
}

impl ClientCtxInner {
    fn new() -> Self {
        Self {
            client: None,
            flashes: Vec::new(),
            request_start: Instant::now(),
        }
    }
}

/// Client context passed to routes and templates.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Rc<RefCell<ClientCtxInner>>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(ClientCtxInner::new())))
    }
}

impl ClientCtx {
    fn get_client_ctx(extensions: &mut Extensions) -> Self {
        match extensions.get::<Rc<RefCell<ClientCtxInner>>>() {
            // Existing record in extensions; pull it.
            Some(inner) => Self(Rc::clone(inner)),
            // No existing record; create and insert it.
            None => {
                let inner = Rc::new(RefCell::new(ClientCtxInner::new()));
                extensions.insert(inner.clone());
                Self(inner)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.borrow().client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.borrow().client {
            Some(user) => user.name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.0.borrow().client.is_some()
    }

    /// Notices drained from the session at the start of this request.
    pub fn flashes(&self) -> Vec<String> {
        self.0.borrow().flashes.to_owned()
    }

    /// Whether this client is the account the given message rows credit.
    /// Takes the bare id so templates can call it on loop variables.
    pub fn is_author(&self, user_id: &i32) -> bool {
        self.get_id() == Some(*user_id)
    }

    pub fn can_update_message(&self, message: &messages::Model) -> bool {
        self.is_author(&message.user_id)
    }

    pub fn can_delete_message(&self, message: &messages::Model) -> bool {
        self.is_author(&message.user_id)
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.borrow().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in
/// the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ok(ClientCtx::get_client_ctx(&mut req.extensions_mut()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ClientCtxMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service,
            inner: self.0.clone(),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: S,
    #[allow(dead_code)]
    inner: Rc<RefCell<ClientCtxInner>>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Borrows of `req` must be done in a precise way to avoid conflicts.
        // This order is important.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);
        let ctx = ClientCtx::get_client_ctx(&mut req.extensions_mut());
        let fut = self.service.call(req);

        async move {
            match session {
                Ok(session) => {
                    // Resolve the session user and drain queued notices
                    // before the handler runs.
                    let client = authenticate_by_session(&session).await;
                    let flashes = take_flash(&session);

                    let mut inner = ctx.0.borrow_mut();
                    inner.client = client;
                    inner.flashes = flashes;
                }
                Err(e) => {
                    log::error!("ClientCtxMiddleware: Session::extract(): {}", e);
                }
            };
            Ok(fut.await?)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn message_by(user_id: i32) -> messages::Model {
        messages::Model {
            id: 1,
            subject_id: 1,
            parent_id: None,
            user_id,
            author: "alice".to_owned(),
            content: "hello".to_owned(),
            created_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_guest_owns_nothing() {
        let ctx = ClientCtx::default();
        assert!(!ctx.is_user());
        assert_eq!(ctx.get_name(), "Guest");
        assert!(!ctx.can_update_message(&message_by(1)));
        assert!(!ctx.can_delete_message(&message_by(1)));
    }

    #[test]
    fn test_only_the_author_may_mutate() {
        let ctx = ClientCtx::default();
        ctx.0.borrow_mut().client = Some(ClientUser {
            id: 7,
            name: "alice".to_owned(),
        });

        assert!(ctx.is_user());
        assert_eq!(ctx.get_name(), "alice");
        assert!(ctx.can_update_message(&message_by(7)));
        assert!(ctx.can_delete_message(&message_by(7)));
        assert!(!ctx.can_update_message(&message_by(8)));
        assert!(!ctx.can_delete_message(&message_by(8)));
    }
}
