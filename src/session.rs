use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::request::{FromRequest, Outcome, Request};

use crate::models::session::SessionState;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "blogsmith_session";

/// Id of the caller's session, taken from the private session cookie.
/// A fresh id (and cookie) is issued when there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionId(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionId {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookies = request.cookies();
        if let Some(cookie) = cookies.get_private(SESSION_COOKIE) {
            if uuid::Uuid::parse_str(cookie.value()).is_ok() {
                return Outcome::Success(SessionId(cookie.value().to_string()));
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        set_session_cookie(cookies, &id);
        Outcome::Success(SessionId(id))
    }
}

fn set_session_cookie(cookies: &CookieJar<'_>, session_id: &str) {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookies.add_private(cookie);
}

impl SessionId {
    /// Stored state for this session, empty when nothing was saved yet.
    pub fn load(&self, store: &dyn Store) -> SessionState {
        store.session_get(&self.0).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn Store, state: &SessionState) -> Result<(), String> {
        store.session_put(&self.0, state)
    }
}
