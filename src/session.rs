use crate::business::{self, OpError};
use crate::schema::sessions;
use crate::store::{SqliteStore, StoreError};
use crate::DbConn;
use chrono::naive::NaiveDateTime;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use lazy_static::lazy_static;
use regex::Regex;
use ring::rand::{SecureRandom, SystemRandom};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = sessions)]
pub struct Session {
    id: String,
    email: String,
    created_at: NaiveDateTime,
}

// 256 bits of entropy, hex-encoded. The token is the session's primary
// key and the only credential a caller ever presents.
fn new_token() -> Result<String, StoreError> {
    let mut buf = [0u8; 32];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| StoreError::new("failed to generate session token"))?;
    Ok(hex::encode(buf))
}

/// Opens a session for an authenticated email and returns the bearer
/// token. This is what the OAuth callback glue calls once the userinfo
/// fetch has succeeded.
pub fn create(conn: &mut SqliteConnection, session_email: &str) -> Result<String, StoreError> {
    let token = new_token()?;
    let _guard = crate::lock_db_write!()?;
    diesel::insert_into(sessions::table)
        .values(Session {
            id: token.clone(),
            email: session_email.to_string(),
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)
        .map_err(|_| StoreError::new("Database error"))?;
    Ok(token)
}

/// Resolves a bearer token to the email it was issued for. Ok(None)
/// means the token is simply unknown; Err is a real storage failure and
/// must not be mistaken for a missing login.
pub fn find(conn: &mut SqliteConnection, token: &str) -> Result<Option<String>, StoreError> {
    let _guard = crate::lock_db_read!()?;
    sessions::table
        .filter(sessions::id.eq(token))
        .first::<Session>(conn)
        .optional()
        .map(|found| found.map(|s| s.email))
        .map_err(|_| StoreError::new("Database error"))
}

/// The auth gate, run as a request guard before every todo operation.
///
/// A request carries `Authorization: Bearer <token>`; the token resolves
/// to the email that completed the login flow. A user seen for the first
/// time is provisioned on the spot, so the first authenticated request
/// after login transparently creates the user and their todo list.
pub struct CurrentUser {
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = OpError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization") {
            Some(header) if header.starts_with("Bearer ") => header[7..].to_string(),
            _ => return request::Outcome::Error((Status::Unauthorized, OpError::Unauthenticated)),
        };

        let db = match request.guard::<DbConn>().await {
            request::Outcome::Success(db) => db,
            _ => {
                return request::Outcome::Error((
                    Status::InternalServerError,
                    OpError::Internal("database unavailable".into()),
                ))
            }
        };

        let resolved = db
            .run(move |conn| {
                let session_email = match find(conn, &token) {
                    Ok(Some(email)) => email,
                    Ok(None) => return Err(OpError::Unauthenticated),
                    Err(e) => {
                        return Err(OpError::Internal(format!("find_session failed: {}", e)))
                    }
                };

                let mut store = SqliteStore::new(conn);
                if !business::user_exists(&mut store, &session_email)? {
                    let uid = business::ensure_user(&mut store, &session_email)?;
                    log::info!("provisioned new user {} for {}", uid, session_email);
                }
                Ok(session_email)
            })
            .await;

        match resolved {
            Ok(email) => request::Outcome::Success(CurrentUser { email }),
            Err(e @ OpError::Unauthenticated) => {
                request::Outcome::Error((Status::Unauthorized, e))
            }
            Err(e) => request::Outcome::Error((Status::InternalServerError, e)),
        }
    }
}
