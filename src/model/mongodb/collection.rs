use std::ops::Deref;

use mongodb::{bson::doc, error::Error as DbError, Collection, Database, IndexModel};

use crate::model::{tally::TallyEntry, voter::Voter};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Voter registry
impl MongoCollection for Voter {
    const NAME: &'static str = "voters";
}

// Tally store
impl MongoCollection for TallyEntry {
    const NAME: &'static str = "tallies";
}

/// Ensure that all the required indexes exist on the given database.
///
/// Both collections are keyed by voter ID through `_id`, so uniqueness comes
/// for free; the only extra index speeds up candidate listing.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let candidate_index = IndexModel::builder()
        .keys(doc! {"is_candidate": 1})
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    Ok(())
}
