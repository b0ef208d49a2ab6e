use crate::schema::{lists, users};
use chrono::naive::NaiveDateTime;
use diesel::prelude::*;

// A user always owns exactly one todo list; the list row is inserted
// first and the user row references it.
#[derive(Queryable, Debug, Clone)]
pub struct User {
    pub id: i32,
    pub uuid: String,
    pub email: String,
    pub list_id: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct InsertUser<'a> {
    pub uuid: &'a str,
    pub email: &'a str,
    pub list_id: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = lists)]
pub struct InsertList {
    pub active: bool,
    pub created_at: NaiveDateTime,
}
