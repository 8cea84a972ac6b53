// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use controller::review;
use diesel::pg::PgConnection;
use diesel::{insert_into, prelude::*};
use flashcards::establish_connection;
use flashcards::models::{
    collections::NewCollection,
    flashcards::NewFlashcard,
    reviews::{NewCollectionReview, NewSetReview},
    sets::NewFlashcardSet,
    users::NewUser,
};
use flashcards::schema::{
    collection_reviews, collections, flashcard_sets, flashcards as flashcards_sc, set_reviews,
    users,
};
use indicatif::ProgressIterator;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

fn records(dir: &Path, name: &str) -> Result<Vec<csv::StringRecord>, Error> {
    let csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .from_path(dir.join(name))?;

    println!("Collecting records from {}...", name);
    Ok(readable_records(csv, name))
}

// Malformed rows are reported and left out
fn readable_records<R: Read>(mut csv: csv::Reader<R>, name: &str) -> Vec<csv::StringRecord> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for record in csv.records() {
        match record {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                println!("Skipping malformed row of {}: {}", name, e);
            }
        }
    }

    if skipped > 0 {
        println!("Skipped {} rows of {}", skipped, name);
    }

    records
}

fn insert_users(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "users.csv")?;

    let mut users = Vec::new();
    for record in records.iter().progress() {
        users.push(NewUser {
            username: &record[0],
            role: &record[1],
        });
    }

    println!("Pushing users by chunks");
    for chunk in users.chunks(10_000).progress() {
        insert_into(users::table).values(chunk).execute(conn)?;
    }

    Ok(())
}

fn insert_sets(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "sets.csv")?;

    let mut sets = Vec::new();
    for record in records.iter().progress() {
        let description = Some(&record[2]).filter(|description| !description.is_empty());

        sets.push(NewFlashcardSet {
            user_id: record[0].parse()?,
            name: &record[1],
            description,
            private: record[3].parse()?,
        });
    }

    println!("Pushing sets by chunks");
    for chunk in sets.chunks(10_000).progress() {
        insert_into(flashcard_sets::table)
            .values(chunk)
            .execute(conn)?;
    }

    Ok(())
}

fn insert_flashcards(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "flashcards.csv")?;

    let mut cards = Vec::new();
    for record in records.iter().progress() {
        cards.push(NewFlashcard {
            set_id: record[0].parse()?,
            term: &record[1],
            definition: &record[2],
        });
    }

    println!("Pushing flashcards by chunks");
    for chunk in cards.chunks(10_000).progress() {
        insert_into(flashcards_sc::table).values(chunk).execute(conn)?;
    }

    Ok(())
}

fn insert_collections(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "collections.csv")?;

    let mut collections = Vec::new();
    for record in records.iter().progress() {
        collections.push(NewCollection {
            user_id: record[0].parse()?,
            name: &record[1],
        });
    }

    println!("Pushing collections by chunks");
    for chunk in collections.chunks(10_000).progress() {
        insert_into(collections::table)
            .values(chunk)
            .execute(conn)?;
    }

    Ok(())
}

// Rows: user_id, parent_id, rating, review. Invalid reviews are skipped, and
// so is any review after the first of a user on the same parent.
fn valid_reviews(records: &[csv::StringRecord]) -> Result<Vec<(i32, i32, i32, &str)>, Error> {
    let mut reviews = Vec::new();
    let mut seen = HashSet::new();

    for record in records.iter().progress() {
        let user_id: i32 = record[0].parse()?;
        let parent_id: i32 = record[1].parse()?;
        let rating: i32 = record[2].parse()?;
        let text = &record[3];

        if let Err(e) = review::validate(rating, text) {
            println!("Skipping review of user {}: {}", user_id, e);
            continue;
        }

        if !seen.insert((user_id, parent_id)) {
            println!("Skipping duplicated review of user {} on {}", user_id, parent_id);
            continue;
        }

        reviews.push((user_id, parent_id, rating, text));
    }

    Ok(reviews)
}

fn insert_set_reviews(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "set_reviews.csv")?;
    let reviews: Vec<_> = valid_reviews(&records)?
        .into_iter()
        .map(|(user_id, set_id, rating, review)| NewSetReview {
            rating,
            review,
            user_id,
            set_id,
        })
        .collect();

    println!("Pushing set reviews by chunks");
    for chunk in reviews.chunks(10_000).progress() {
        insert_into(set_reviews::table).values(chunk).execute(conn)?;
    }

    Ok(())
}

fn insert_collection_reviews(conn: &PgConnection, dir: &Path) -> Result<(), Error> {
    let records = records(dir, "collection_reviews.csv")?;
    let reviews: Vec<_> = valid_reviews(&records)?
        .into_iter()
        .map(|(user_id, collection_id, rating, review)| NewCollectionReview {
            rating,
            review,
            user_id,
            collection_id,
        })
        .collect();

    println!("Pushing collection reviews by chunks");
    for chunk in reviews.chunks(10_000).progress() {
        insert_into(collection_reviews::table)
            .values(chunk)
            .execute(conn)?;
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    let vars: HashMap<String, String> = dotenv::vars().collect();

    let url = vars
        .get("DATABASE_URL")
        .map(String::as_str)
        .unwrap_or("postgres://postgres:@localhost/flashcards");
    let dir = Path::new(vars.get("DATA_DIR").map(String::as_str).unwrap_or("data"));

    let conn = establish_connection(url)?;

    insert_users(&conn, dir)?;
    insert_sets(&conn, dir)?;
    insert_flashcards(&conn, dir)?;
    insert_collections(&conn, dir)?;
    insert_set_reviews(&conn, dir)?;
    insert_collection_reviews(&conn, dir)?;

    println!("Done, run load_averages to fill average ratings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Vec<csv::StringRecord> {
        let csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        readable_records(csv, "set_reviews.csv")
    }

    #[test]
    fn malformed_rows_are_left_out() {
        let records = parse("user_id,set_id,rating,review\n1,2,5,great\n3,4\n5,6,1,awful\n");

        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "5");
    }

    #[test]
    fn duplicated_and_invalid_reviews_are_skipped() -> Result<(), Error> {
        let records = parse(
            "user_id,set_id,rating,review\n\
             1,2,5,great deck\n\
             1,2,1,changed my mind\n\
             1,3,4,also good\n\
             2,2,9,out of range\n\
             2,2,3,fine\n",
        );

        let reviews = valid_reviews(&records)?;

        assert_eq!(
            reviews,
            vec![(1, 2, 5, "great deck"), (1, 3, 4, "also good"), (2, 2, 3, "fine")]
        );

        Ok(())
    }
}
