use crate::schema::items;
use chrono::naive::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub list_id: i32,
    pub name: String,
    pub description: String,
    pub done: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = items)]
pub struct InsertItem<'a> {
    pub list_id: i32,
    pub name: &'a str,
    pub description: &'a str,
    pub done: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

// Partial update applied by the conditional UPDATE in the store;
// None fields are left untouched.
#[derive(AsChangeset)]
#[diesel(table_name = items)]
pub struct ItemChanges {
    pub done: Option<bool>,
    pub active: Option<bool>,
    pub updated_at: Option<NaiveDateTime>,
}

// Wire representation of an item, with the field names the HTTP
// gateway exposes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoEntry {
    pub item_name: String,
    pub item_description: String,
    pub done: bool,
}

impl From<Item> for TodoEntry {
    fn from(it: Item) -> TodoEntry {
        TodoEntry {
            item_name: it.name,
            item_description: it.description,
            done: it.done,
        }
    }
}
