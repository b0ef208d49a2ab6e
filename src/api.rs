use crate::business::{self, OpError};
use crate::item::TodoEntry;
use crate::session::{self, CurrentUser};
use crate::store::SqliteStore;
use crate::{AppConfig, DbConn};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use std::vec::Vec;

pub fn routes() -> Vec<rocket::Route> {
    routes![
        index,
        session_create,
        todo_add,
        todo_delete,
        todo_mark,
        todo_list,
        ping
    ]
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![unauthorized]
}

#[derive(Serialize)]
#[serde(untagged)]
enum Response<T: Serialize> {
    Error { errors: Vec<String> },
    Success(T),
}

// Some shorthands
type JsonResp<T> = Json<Response<T>>;

fn success_resp<T: Serialize>(resp: T) -> Custom<JsonResp<T>> {
    Custom(Status::Ok, Json(Response::Success(resp)))
}

fn error_resp<T: Serialize>(status: Status, errors: Vec<String>) -> Custom<JsonResp<T>> {
    Custom(status, Json(Response::Error { errors }))
}

fn op_error_resp<T: Serialize>(e: OpError) -> Custom<JsonResp<T>> {
    let status = match e {
        OpError::Validation(_) => Status::BadRequest,
        OpError::Unauthenticated => Status::Unauthorized,
        OpError::NotFound(_) => Status::NotFound,
        OpError::Internal(_) => Status::InternalServerError,
    };
    error_resp(status, vec![e.to_string()])
}

// Empty acknowledgement body, `{}` on the wire.
#[derive(Serialize)]
struct Ack {}

#[get("/")]
fn index() -> &'static str {
    "todoserv is running. Sign in via POST /auth/session."
}

#[derive(Deserialize)]
struct SessionParams {
    email: String,
}

#[derive(Serialize)]
struct SessionResult {
    token: String,
}

#[post("/auth/session", format = "json", data = "<params>")]
async fn session_create(
    db: DbConn,
    params: Json<SessionParams>,
) -> Custom<JsonResp<SessionResult>> {
    let email = params.into_inner().email;
    if !session::valid_email(&email) {
        return error_resp(Status::BadRequest, vec!["invalid email".to_string()]);
    }

    match db.run(move |conn| session::create(conn, &email)).await {
        Ok(token) => success_resp(SessionResult { token }),
        Err(e) => error_resp(Status::InternalServerError, vec![e.to_string()]),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AddTodoRequest {
    item_name: String,
    item_description: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdateTodoRequest {
    item_name: String,
}

#[derive(Serialize)]
struct ListTodoReply {
    count: i32,
    items: Vec<TodoEntry>,
}

#[derive(Serialize)]
struct PingReply {
    pong: String,
}

#[post("/todo/add", format = "json", data = "<params>")]
async fn todo_add(
    db: DbConn,
    user: CurrentUser,
    params: Json<AddTodoRequest>,
) -> Custom<JsonResp<Ack>> {
    let req = params.into_inner();
    let res = db
        .run(move |conn| {
            business::add_item(
                &mut SqliteStore::new(conn),
                &user.email,
                &req.item_name,
                &req.item_description,
            )
        })
        .await;
    match res {
        Ok(()) => success_resp(Ack {}),
        Err(e) => op_error_resp(e),
    }
}

#[post("/todo/delete", format = "json", data = "<params>")]
async fn todo_delete(
    db: DbConn,
    user: CurrentUser,
    params: Json<UpdateTodoRequest>,
) -> Custom<JsonResp<Ack>> {
    let req = params.into_inner();
    let res = db
        .run(move |conn| {
            business::delete_item(&mut SqliteStore::new(conn), &user.email, &req.item_name)
        })
        .await;
    match res {
        Ok(()) => success_resp(Ack {}),
        Err(e) => op_error_resp(e),
    }
}

#[post("/todo/mark", format = "json", data = "<params>")]
async fn todo_mark(
    db: DbConn,
    user: CurrentUser,
    config: &State<AppConfig>,
    params: Json<UpdateTodoRequest>,
) -> Custom<JsonResp<Ack>> {
    let req = params.into_inner();
    let revive = config.mark_done_revives;
    let res = db
        .run(move |conn| {
            business::mark_done(
                &mut SqliteStore::new(conn),
                &user.email,
                &req.item_name,
                revive,
            )
        })
        .await;
    match res {
        Ok(()) => success_resp(Ack {}),
        Err(e) => op_error_resp(e),
    }
}

#[get("/todo/list")]
async fn todo_list(db: DbConn, user: CurrentUser) -> Custom<JsonResp<ListTodoReply>> {
    let res = db
        .run(move |conn| business::list_items(&mut SqliteStore::new(conn), &user.email))
        .await;
    match res {
        Ok(listed) => {
            let entries: Vec<TodoEntry> = listed.into_iter().map(Into::into).collect();
            success_resp(ListTodoReply {
                count: entries.len() as i32,
                items: entries,
            })
        }
        Err(e) => op_error_resp(e),
    }
}

#[get("/ping")]
async fn ping(_user: CurrentUser) -> Custom<JsonResp<PingReply>> {
    success_resp(PingReply {
        pong: business::ping().to_string(),
    })
}

// Guard failures surface through this catcher so that the 401 body
// still carries the instruction to log in.
#[catch(401)]
fn unauthorized() -> Custom<JsonResp<Ack>> {
    error_resp(Status::Unauthorized, vec![OpError::Unauthenticated.to_string()])
}
