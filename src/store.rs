use crate::item::{InsertItem, Item, ItemChanges};
use crate::schema::{items, lists, users};
use crate::user::{InsertList, InsertUser, User};
use crate::{lock_db_read, lock_db_write};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(s: impl Into<String>) -> StoreError {
        StoreError(s.into())
    }
}

impl From<&str> for StoreError {
    fn from(s: &str) -> StoreError {
        StoreError::new(s)
    }
}

impl From<DieselError> for StoreError {
    fn from(e: DieselError) -> StoreError {
        StoreError(e.to_string())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an existing item should be updated; the store applies this as a
/// single conditional UPDATE so that concurrent callers cannot clobber
/// each other between a lookup and a write.
pub struct ItemUpdate {
    pub done: Option<bool>,
    pub active: Option<bool>,
    /// Match only items that are still active. When false, soft-deleted
    /// items are eligible too (used by the "mark revives" behavior).
    pub require_active: bool,
}

/// Storage access used by the business layer. The production
/// implementation runs on Diesel/SQLite; tests substitute an in-memory
/// fake without touching any process-wide state.
pub trait Store {
    /// Ok(None) when no user row matches; Err only for real storage
    /// failures.
    fn get_user(&mut self, user_email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a fresh todo list and a user referencing it, atomically.
    fn create_user(&mut self, user_email: &str) -> Result<User, StoreError>;

    /// Ok(false) when an active item of that name already exists in the
    /// list.
    fn add_item(&mut self, list: i32, item_name: &str, item_description: &str)
        -> Result<bool, StoreError>;

    /// Ok(true) when a row was hit, Ok(false) when nothing matched.
    fn update_item(&mut self, list: i32, item_name: &str, update: ItemUpdate)
        -> Result<bool, StoreError>;

    /// Active items of a list, in insertion order (ascending row id).
    fn list_items(&mut self, list: i32) -> Result<Vec<Item>, StoreError>;
}

pub struct SqliteStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> SqliteStore<'c> {
        SqliteStore { conn }
    }
}

impl<'c> Store for SqliteStore<'c> {
    fn get_user(&mut self, user_email: &str) -> Result<Option<User>, StoreError> {
        let _guard = lock_db_read!()?;
        users::table
            .filter(users::email.eq(user_email))
            .first::<User>(self.conn)
            .optional()
            .map_err(|_| "Database error".into())
    }

    fn create_user(&mut self, user_email: &str) -> Result<User, StoreError> {
        let _guard = lock_db_write!()?;
        let now = Utc::now().naive_utc();
        self.conn
            .transaction::<User, DieselError, _>(|conn| {
                let list: i32 = diesel::insert_into(lists::table)
                    .values(InsertList {
                        active: true,
                        created_at: now,
                    })
                    .returning(lists::id)
                    .get_result(conn)?;

                let uid = Uuid::new_v4().to_string();
                diesel::insert_into(users::table)
                    .values(InsertUser {
                        uuid: &uid,
                        email: user_email,
                        list_id: list,
                        active: true,
                        created_at: now,
                    })
                    .execute(conn)?;

                users::table
                    .filter(users::email.eq(user_email))
                    .first::<User>(conn)
            })
            .map_err(StoreError::from)
    }

    fn add_item(
        &mut self,
        list: i32,
        item_name: &str,
        item_description: &str,
    ) -> Result<bool, StoreError> {
        let _guard = lock_db_write!()?;
        let res = diesel::insert_into(items::table)
            .values(InsertItem {
                list_id: list,
                name: item_name,
                description: item_description,
                done: false,
                active: true,
                created_at: Utc::now().naive_utc(),
            })
            .execute(self.conn);
        match res {
            Ok(_) => Ok(true),
            // The partial unique index on (list_id, name) guards active
            // items only; hitting it means the name is already taken.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn update_item(
        &mut self,
        list: i32,
        item_name: &str,
        update: ItemUpdate,
    ) -> Result<bool, StoreError> {
        let _guard = lock_db_write!()?;
        let changes = ItemChanges {
            done: update.done,
            active: update.active,
            updated_at: Some(Utc::now().naive_utc()),
        };
        let target = items::list_id.eq(list).and(items::name.eq(item_name));
        let affected = if update.require_active {
            diesel::update(items::table.filter(target.and(items::active.eq(true))))
                .set(&changes)
                .execute(self.conn)?
        } else {
            diesel::update(items::table.filter(target))
                .set(&changes)
                .execute(self.conn)?
        };
        Ok(affected > 0)
    }

    fn list_items(&mut self, list: i32) -> Result<Vec<Item>, StoreError> {
        let _guard = lock_db_read!()?;
        items::table
            .filter(items::list_id.eq(list).and(items::active.eq(true)))
            .order(items::id.asc())
            .load::<Item>(self.conn)
            .map_err(|_| "Database error".into())
    }
}
