use crate::error::{is_unique_violation, Result, ScoutError};
use crate::models::{NewRestaurant, RestaurantRecord, SavedRestaurant, SavedRestaurantView};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Result of writing one restaurant row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    AlreadyPresent,
}

/// Result of bookmarking a restaurant for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(SavedRestaurant),
    AlreadySaved,
}

/// Relational store for restaurants and saved restaurants.
///
/// Owns its connection for the lifetime of a run; dropping the store
/// closes it.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| ScoutError::database(format!("opening {}", path.display()), e))?;
        Self::configure(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ScoutError::database("opening in-memory database", e))?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ScoutError::database("configuring connection", e))?;
        Ok(Self { conn })
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS restaurant (
                    id          INTEGER PRIMARY KEY,
                    listing_key TEXT NOT NULL UNIQUE,
                    country     TEXT,
                    city        TEXT,
                    name        TEXT NOT NULL,
                    address     TEXT NOT NULL DEFAULT '',
                    category    TEXT NOT NULL,
                    description TEXT NOT NULL,
                    image_url   TEXT NOT NULL,
                    detail_link TEXT,
                    lat         REAL,
                    lng         REAL,
                    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS saved_restaurant (
                    id            TEXT PRIMARY KEY,
                    user_id       TEXT NOT NULL,
                    restaurant_id INTEGER NOT NULL REFERENCES restaurant(id),
                    saved_at      TEXT NOT NULL,
                    UNIQUE(user_id, restaurant_id)
                );
                CREATE INDEX IF NOT EXISTS idx_saved_user ON saved_restaurant(user_id);
                ",
            )
            .map_err(|e| ScoutError::database("creating schema", e))
    }

    /// Insert one restaurant in its own transaction. A uniqueness clash is
    /// reported as `AlreadyPresent`; the row already stored is left as is.
    pub fn insert_restaurant(&self, row: &NewRestaurant) -> Result<InsertOutcome> {
        let context = || format!("inserting restaurant `{}`", row.name);

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ScoutError::database(context(), e))?;

        let inserted = tx.execute(
            "INSERT INTO restaurant
             (listing_key, country, city, name, address, category, description, image_url, detail_link, lat, lng)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                row.listing_key,
                row.country,
                row.city,
                row.name,
                row.address,
                row.category,
                row.description,
                row.image_url,
                row.detail_link,
                row.lat,
                row.lng,
            ],
        );

        match inserted {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                tx.commit().map_err(|e| ScoutError::database(context(), e))?;
                Ok(InsertOutcome::Inserted(id))
            }
            Err(e) if is_unique_violation(&e) => {
                debug!("Restaurant `{}` already stored", row.name);
                Ok(InsertOutcome::AlreadyPresent)
            }
            Err(e) => Err(ScoutError::database(context(), e)),
        }
    }

    /// Bookmark a restaurant for a user. `id` defaults to a fresh UUID.
    /// Only a repeated (user, restaurant) pair counts as already saved; a
    /// reused bookmark id for another pair is an error.
    pub fn save_restaurant(
        &self,
        user_id: &str,
        restaurant_id: i64,
        id: Option<&str>,
    ) -> Result<SaveOutcome> {
        let saved = SavedRestaurant {
            id: id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: user_id.to_string(),
            restaurant_id,
        };

        let inserted = self.conn.execute(
            "INSERT INTO saved_restaurant (id, user_id, restaurant_id, saved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![saved.id, saved.user_id, saved.restaurant_id, Utc::now()],
        );

        let context = || format!("saving restaurant {} for user `{}`", restaurant_id, user_id);

        match inserted {
            Ok(_) => Ok(SaveOutcome::Saved(saved)),
            Err(e) if is_unique_violation(&e) => {
                if self.is_saved(user_id, restaurant_id)? {
                    Ok(SaveOutcome::AlreadySaved)
                } else {
                    Err(ScoutError::database(
                        format!("{}: bookmark id `{}` is already in use", context(), saved.id),
                        e,
                    ))
                }
            }
            Err(e) => Err(ScoutError::database(context(), e)),
        }
    }

    pub fn is_saved(&self, user_id: &str, restaurant_id: i64) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM saved_restaurant WHERE user_id = ?1 AND restaurant_id = ?2",
                params![user_id, restaurant_id],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| {
                ScoutError::database(format!("checking saved restaurant {} for `{}`", restaurant_id, user_id), e)
            })
    }

    /// Every restaurant the user saved, newest first
    pub fn saved_for_user(&self, user_id: &str) -> Result<Vec<SavedRestaurantView>> {
        let context = || format!("loading saved restaurants for `{}`", user_id);

        let mut stmt = self
            .conn
            .prepare(
                "SELECT r.id, r.name, r.city, r.country, r.category, r.description, r.image_url, sr.saved_at
                 FROM saved_restaurant sr
                 JOIN restaurant r ON sr.restaurant_id = r.id
                 WHERE sr.user_id = ?1
                 ORDER BY sr.saved_at DESC, r.id DESC",
            )
            .map_err(|e| ScoutError::database(context(), e))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(SavedRestaurantView {
                    restaurant_id: row.get(0)?,
                    name: row.get(1)?,
                    city: row.get(2)?,
                    country: row.get(3)?,
                    category: row.get(4)?,
                    description: row.get(5)?,
                    image_url: row.get(6)?,
                    saved_at: row.get(7)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| ScoutError::database(context(), e))?;

        Ok(rows)
    }

    pub fn find_restaurant_id(&self, listing_key: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM restaurant WHERE listing_key = ?1",
                params![listing_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ScoutError::database(format!("looking up restaurant `{}`", listing_key), e))
    }

    pub fn get_restaurant(&self, id: i64) -> Result<Option<RestaurantRecord>> {
        self.conn
            .query_row(
                "SELECT id, country, city, name, address, category, description, image_url, detail_link, lat, lng
                 FROM restaurant WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RestaurantRecord {
                        id: row.get(0)?,
                        country: row.get(1)?,
                        city: row.get(2)?,
                        name: row.get(3)?,
                        address: row.get(4)?,
                        category: row.get(5)?,
                        description: row.get(6)?,
                        image_url: row.get(7)?,
                        detail_link: row.get(8)?,
                        lat: row.get(9)?,
                        lng: row.get(10)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ScoutError::database(format!("loading restaurant {}", id), e))
    }

    pub fn count_restaurants(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM restaurant", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| ScoutError::database("counting restaurants", e))
    }
}
