use std::collections::HashMap;

use chrono::NaiveDate;
use mongodb::{
    bson::doc,
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR},
    options::{FindOptions, SessionOptions, UpdateOptions},
    Client, ClientSession, Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    ballot::Selection,
    store::VotingStore,
    tally::{CandidateResult, TallyEntry},
    voter::{NewVoter, Voter, VoterId, DOB_FORMAT},
};

use super::{collection::ensure_indexes_exist, errors::is_duplicate_key_error, Coll};

/// How many times a transaction is attempted when it keeps hitting
/// transient write conflicts with concurrent transactions.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// The production store, backed by MongoDB.
///
/// Multi-document units of work run inside transactions, so the deployment
/// must be a replica set.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the database and perform any setup necessary.
    pub async fn connect(db_uri: &str, db_name: &str) -> std::result::Result<Self, DbError> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self { client, db })
    }

    /// The database this store lives in.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn voters(&self) -> Coll<Voter> {
        Coll::from_db(&self.db)
    }

    fn tallies(&self) -> Coll<TallyEntry> {
        Coll::from_db(&self.db)
    }

    /// One attempt at applying a ballot inside a transaction.
    async fn try_record_ballot(
        &self,
        session: &mut ClientSession,
        voter_id: VoterId,
        selection: &Selection,
    ) -> std::result::Result<bool, DbError> {
        session.start_transaction(None).await?;

        // Claim the voter's ballot first; this fails to match if they already voted.
        let filter = doc! {
            "_id": voter_id,
            "has_voted": false,
        };
        let update = doc! {
            "$set": {
                "has_voted": true,
            }
        };
        let result = self
            .voters()
            .update_one_with_session(filter, update, None, session)
            .await?;
        if result.modified_count != 1 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        let upsert = UpdateOptions::builder().upsert(true).build();
        let tallies = self.tallies();
        for candidate in selection.iter() {
            let update = doc! {
                "$inc": {
                    "count": 1_i64,
                }
            };
            tallies
                .update_one_with_session(doc! {"_id": *candidate}, update, upsert.clone(), session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(true)
    }
}

#[rocket::async_trait]
impl VotingStore for MongoStore {
    async fn voter(&self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.voters().find_one(doc! {"_id": id}, None).await?)
    }

    async fn eligible_voter(&self, id: VoterId, dob: NaiveDate) -> Result<Option<Voter>> {
        let filter = doc! {
            "_id": id,
            "dob": dob.format(DOB_FORMAT).to_string(),
            "has_voted": false,
        };
        Ok(self.voters().find_one(filter, None).await?)
    }

    async fn candidates(&self) -> Result<Vec<Voter>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let candidates = self
            .voters()
            .find(doc! {"is_candidate": true}, options)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn record_ballot(&self, voter_id: VoterId, selection: &Selection) -> Result<bool> {
        let mut attempt = 1;
        loop {
            // A fresh session per attempt; dropping one mid-transaction aborts it.
            let mut session = self.client.start_session(None).await?;
            match self
                .try_record_ballot(&mut session, voter_id, selection)
                .await
            {
                Err(err)
                    if err.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    debug!("Ballot for voter {voter_id} hit a write conflict (attempt {attempt})");
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    async fn existing_voter_ids(&self, ids: &[VoterId]) -> Result<Vec<VoterId>> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let existing = self
            .voters()
            .distinct("_id", doc! {"_id": {"$in": ids}}, None)
            .await?
            .into_iter()
            .filter_map(|id| id.as_i64())
            .map(VoterId::new)
            .collect();
        Ok(existing)
    }

    async fn insert_voters(&self, voters: Vec<NewVoter>) -> Result<u64> {
        // MongoDB refuses an empty `insert_many`.
        if voters.is_empty() {
            return Ok(0);
        }
        let voters: Vec<Voter> = voters.into_iter().map(Voter::from).collect();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        let result = self
            .voters()
            .insert_many_with_session(&voters, None, &mut session)
            .await;
        let inserted = match result {
            Ok(result) => result.inserted_ids.len() as u64,
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(Error::Status(
                    Status::Conflict,
                    "Roster contains a voter ID that already exists".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };
        session.commit_transaction().await?;

        Ok(inserted)
    }

    async fn designate_candidates(&self, ids: &[VoterId]) -> Result<u64> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let filter = doc! {
            "_id": {
                "$in": ids,
            }
        };
        let update = doc! {
            "$set": {
                "is_candidate": true,
            }
        };
        let result = self.voters().update_many(filter, update, None).await?;
        Ok(result.matched_count)
    }

    #[cfg(test)]
    async fn tallies(&self) -> Result<Vec<TallyEntry>> {
        let tallies = self.tallies().find(None, None).await?.try_collect().await?;
        Ok(tallies)
    }

    async fn results(&self) -> Result<Vec<CandidateResult>> {
        // Ensure we read a consistent snapshot of candidates and tallies.
        let session_options = SessionOptions::builder().snapshot(true).build();
        let mut session = self.client.start_session(Some(session_options)).await?;

        let mut candidates = Vec::new();
        let mut cursor = self
            .voters()
            .find_with_session(doc! {"is_candidate": true}, None, &mut session)
            .await?;
        while let Some(candidate) = cursor.next(&mut session).await {
            candidates.push(candidate?);
        }

        let mut tallies = HashMap::new();
        let mut cursor = self
            .tallies()
            .find_with_session(None, None, &mut session)
            .await?;
        while let Some(entry) = cursor.next(&mut session).await {
            let entry = entry?;
            tallies.insert(entry.candidate_id, entry);
        }

        let results = candidates
            .into_iter()
            .map(|candidate| {
                let entry = tallies.get(&candidate.id);
                CandidateResult::join(candidate, entry)
            })
            .collect();
        Ok(results)
    }
}

/// These tests need a MongoDB replica set, addressed by `VOTEBOX_TEST_DB_URI`.
/// Run them with `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    async fn test_store() -> MongoStore {
        let uri = std::env::var("VOTEBOX_TEST_DB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string());
        // Use a random name to avoid collisions between tests.
        let random: u32 = rand::random();
        let db = format!("test{random}");
        info!("Using database {db}");
        MongoStore::connect(&uri, &db).await.unwrap()
    }

    async fn seed(store: &MongoStore) {
        store.insert_voters(NewVoter::examples()).await.unwrap();
        let candidates: Vec<VoterId> = (1..=11).map(VoterId::new).collect();
        store.designate_candidates(&candidates).await.unwrap();
    }

    fn selection(ids: impl IntoIterator<Item = i64>) -> Selection {
        let candidates: BTreeSet<VoterId> = (1..=11).map(VoterId::new).collect();
        Selection::validate(ids.into_iter().map(VoterId::new).collect(), &candidates).unwrap()
    }

    #[rocket::async_test]
    #[ignore = "requires a MongoDB replica set"]
    async fn ballots_and_results() {
        let store = test_store().await;
        seed(&store).await;

        let voter = VoterId::new(12);
        assert!(store.record_ballot(voter, &selection(1..=9)).await.unwrap());
        assert!(!store.record_ballot(voter, &selection(3..=11)).await.unwrap());
        assert!(store.voter(voter).await.unwrap().unwrap().has_voted);

        let results = store.results().await.unwrap();
        assert_eq!(results.len(), 11);
        assert_eq!(results.iter().map(|r| r.votes).sum::<u64>(), 9);
        assert!(results
            .iter()
            .filter(|r| r.candidate_id.get() > 9)
            .all(|r| r.votes == 0));

        store.database().drop(None).await.unwrap();
    }

    #[rocket::async_test]
    #[ignore = "requires a MongoDB replica set"]
    async fn concurrent_ballots_all_count() {
        let store = test_store().await;
        seed(&store).await;

        // Every ballot overlaps the others, so their transactions conflict.
        let first_choice = |voter: i64| (voter - 1) % 3 + 1;
        let handles: Vec<_> = (1..=13)
            .map(|voter| {
                let store = store.clone();
                let first = first_choice(voter);
                rocket::tokio::spawn(async move {
                    store
                        .record_ballot(VoterId::new(voter), &selection(first..=first + 8))
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let mut expected: HashMap<VoterId, i64> = HashMap::new();
        for voter in 1..=13 {
            let first = first_choice(voter);
            for candidate in first..=first + 8 {
                *expected.entry(VoterId::new(candidate)).or_insert(0) += 1;
            }
        }
        let tallies: HashMap<VoterId, i64> = VotingStore::tallies(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| (entry.candidate_id, entry.count))
            .collect();
        assert_eq!(tallies, expected);

        store.database().drop(None).await.unwrap();
    }

    #[rocket::async_test]
    #[ignore = "requires a MongoDB replica set"]
    async fn registry_operations() {
        let store = test_store().await;
        seed(&store).await;

        let voter = NewVoter::example(4);
        assert_eq!(
            store.eligible_voter(voter.id, voter.dob).await.unwrap(),
            store.voter(voter.id).await.unwrap()
        );
        assert!(store
            .eligible_voter(voter.id, voter.dob.succ_opt().unwrap())
            .await
            .unwrap()
            .is_none());

        let err = store
            .insert_voters(vec![NewVoter::example(30), NewVoter::example(2)])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
        assert!(store.voter(VoterId::new(30)).await.unwrap().is_none());

        let existing = store
            .existing_voter_ids(&[VoterId::new(2), VoterId::new(40)])
            .await
            .unwrap();
        assert_eq!(existing, vec![VoterId::new(2)]);

        let candidates = store.candidates().await.unwrap();
        assert_eq!(candidates.len(), 11);
        assert!(candidates.windows(2).all(|w| w[0].id < w[1].id));

        store.database().drop(None).await.unwrap();
    }
}
