// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::schema::{daily_set_creations, settings};
use chrono::{NaiveDate, NaiveDateTime};

// To query data from the database
#[derive(Debug, Clone, Queryable)]
pub struct DailySetCreations {
    pub date: NaiveDate,
    pub total_created: i32,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "daily_set_creations"]
pub struct NewDailySetCreations {
    pub date: NaiveDate,
    pub total_created: i32,
}

#[derive(Debug, Clone, Queryable)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
