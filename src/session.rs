use crate::get_db_pool;
use crate::orm::users;
use crate::user::ClientUser;
use actix_session::Session;
use sea_orm::{entity::*, query::*};

const SESSION_USER_KEY: &str = "uid";
const SESSION_FLASH_KEY: &str = "flash";

/// Resolves the session's stored user id to a live account.
/// A stale id (deleted or never-existing user) reads as a guest.
pub async fn authenticate_by_session(session: &Session) -> Option<ClientUser> {
    let id = match session.get::<i32>(SESSION_USER_KEY) {
        Ok(Some(id)) => id,
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_by_session: session.get(): {}", e);
            return None;
        }
    };

    match users::Entity::find_by_id(id)
        .into_model::<ClientUser>()
        .one(get_db_pool())
        .await
    {
        Ok(user) => user,
        Err(e) => {
            log::error!("authenticate_by_session: {}", e);
            None
        }
    }
}

/// Replaces whatever session state existed with a fresh login.
pub fn start_session(session: &Session, user_id: i32) {
    session.clear();
    session.renew();
    if let Err(e) = session.insert(SESSION_USER_KEY, user_id) {
        log::error!("start_session: {}", e);
    }
}

/// Drops the login but keeps the rest of the session state, so notices
/// queued during the logout request survive its redirect.
pub fn end_session(session: &Session) {
    session.remove(SESSION_USER_KEY);
    session.renew();
}

/// Queues a notice for display on the next rendered page.
pub fn flash(session: &Session, message: &str) {
    let mut queue = match session.get::<Vec<String>>(SESSION_FLASH_KEY) {
        Ok(Some(queue)) => queue,
        _ => Vec::new(),
    };
    queue.push(message.to_owned());
    if let Err(e) = session.insert(SESSION_FLASH_KEY, queue) {
        log::error!("flash: {}", e);
    }
}

/// Drains the queued notices. Reading empties the queue, so each notice
/// displays exactly once.
pub fn take_flash(session: &Session) -> Vec<String> {
    let queue = match session.get::<Vec<String>>(SESSION_FLASH_KEY) {
        Ok(Some(queue)) => queue,
        _ => Vec::new(),
    };
    session.remove(SESSION_FLASH_KEY);
    queue
}
