// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

mod basics;

use basics::{parse_date, parse_id, parse_ident, parse_number, parse_separator, parse_string};
use chrono::NaiveDate;
use controller::{ReviewKind, Role, SearchBy};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::char;
use nom::combinator::{map, map_res, opt};
use nom::error::ErrorKind;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Database {
    Flashcards,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Connect(Database),
    CreateUser(String, Role),
    Login(SearchBy),
    QueryUser(SearchBy),
    QuerySet(SearchBy),
    QueryCollection(SearchBy),
    QueryReviews(ReviewKind, i32),
    CreateSet(String, Option<String>),
    CreateCollection(String),
    DeleteSet(i32),
    DeleteCollection(i32),
    AddFlashcard(i32, String, String),
    QueryFlashcards(i32),
    Review(ReviewKind, i32, i32, String),
    UpdateReview(ReviewKind, i32, i32, String),
    DeleteReview(ReviewKind, i32),
    /// A single parent, or every parent of the kind
    Recompute(ReviewKind, Option<i32>),
    DailyLimit,
    DailyCount(Option<NaiveDate>),
    CanCreate,
    SetDailyLimit(i64),
}

fn args<'a, O, F>(parser: F) -> impl Fn(&'a str) -> IResult<&'a str, O>
where
    F: Fn(&'a str) -> IResult<&'a str, O>,
{
    delimited(char('('), parser, char(')'))
}

fn parse_database(input: &str) -> IResult<&str, Database> {
    map_res(parse_ident, |name: &str| match name {
        "flashcards" => Ok(Database::Flashcards),
        "memory" => Ok(Database::Memory),
        _ => Err(ErrorKind::Tag),
    })(input)
}

fn parse_kind(input: &str) -> IResult<&str, ReviewKind> {
    map_res(parse_ident, |kind: &str| match kind {
        "set" => Ok(ReviewKind::FlashcardSet),
        "collection" => Ok(ReviewKind::Collection),
        _ => Err(ErrorKind::Tag),
    })(input)
}

fn parse_role(input: &str) -> IResult<&str, Role> {
    map_res(parse_ident, |role: &str| role.parse::<Role>())(input)
}

fn parse_search_by(input: &str) -> IResult<&str, SearchBy> {
    alt((
        map(preceded(tag("id"), args(parse_id)), SearchBy::Id),
        map(
            preceded(tag("name"), args(take_till1(|c: char| c == ')'))),
            SearchBy::name,
        ),
    ))(input)
}

fn parse_review(input: &str) -> IResult<&str, (ReviewKind, i32, i32, String)> {
    let (input, (kind, _, id, _, rating, _, text)) = args(tuple((
        parse_kind,
        parse_separator,
        parse_id,
        parse_separator,
        parse_id,
        parse_separator,
        parse_string,
    )))(input)?;

    Ok((input, (kind, id, rating, text.into())))
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    let (rest, name) = parse_ident(input)?;

    let (rest, statement) = match name {
        "connect" => {
            let (rest, database) = args(parse_database)(rest)?;
            (rest, Statement::Connect(database))
        }

        "create_user" => {
            let (rest, (username, role)) = args(tuple((
                parse_string,
                opt(preceded(parse_separator, parse_role)),
            )))(rest)?;

            (
                rest,
                Statement::CreateUser(username.into(), role.unwrap_or_default()),
            )
        }

        "login" => {
            let (rest, by) = args(parse_search_by)(rest)?;
            (rest, Statement::Login(by))
        }

        "query_user" => {
            let (rest, by) = args(parse_search_by)(rest)?;
            (rest, Statement::QueryUser(by))
        }

        "query_set" => {
            let (rest, by) = args(parse_search_by)(rest)?;
            (rest, Statement::QuerySet(by))
        }

        "query_collection" => {
            let (rest, by) = args(parse_search_by)(rest)?;
            (rest, Statement::QueryCollection(by))
        }

        "query_reviews" => {
            let (rest, (kind, _, id)) = args(tuple((parse_kind, parse_separator, parse_id)))(rest)?;
            (rest, Statement::QueryReviews(kind, id))
        }

        "create_set" => {
            let (rest, (name, description)) = args(tuple((
                parse_string,
                opt(preceded(parse_separator, parse_string)),
            )))(rest)?;

            (
                rest,
                Statement::CreateSet(name.into(), description.map(String::from)),
            )
        }

        "create_collection" => {
            let (rest, name) = args(parse_string)(rest)?;
            (rest, Statement::CreateCollection(name.into()))
        }

        "delete_set" => {
            let (rest, id) = args(parse_id)(rest)?;
            (rest, Statement::DeleteSet(id))
        }

        "delete_collection" => {
            let (rest, id) = args(parse_id)(rest)?;
            (rest, Statement::DeleteCollection(id))
        }

        "add_flashcard" => {
            let (rest, (set_id, _, term, _, definition)) = args(tuple((
                parse_id,
                parse_separator,
                parse_string,
                parse_separator,
                parse_string,
            )))(rest)?;

            (
                rest,
                Statement::AddFlashcard(set_id, term.into(), definition.into()),
            )
        }

        "query_flashcards" => {
            let (rest, set_id) = args(parse_id)(rest)?;
            (rest, Statement::QueryFlashcards(set_id))
        }

        "review" => {
            let (rest, (kind, parent, rating, text)) = parse_review(rest)?;
            (rest, Statement::Review(kind, parent, rating, text))
        }

        "update_review" => {
            let (rest, (kind, id, rating, text)) = parse_review(rest)?;
            (rest, Statement::UpdateReview(kind, id, rating, text))
        }

        "delete_review" => {
            let (rest, (kind, _, id)) = args(tuple((parse_kind, parse_separator, parse_id)))(rest)?;
            (rest, Statement::DeleteReview(kind, id))
        }

        "recompute" => {
            let (rest, (kind, id)) = args(tuple((
                parse_kind,
                opt(preceded(parse_separator, parse_id)),
            )))(rest)?;

            (rest, Statement::Recompute(kind, id))
        }

        "daily_limit" => (rest, Statement::DailyLimit),

        "daily_count" => {
            let (rest, date) = opt(args(parse_date))(rest)?;
            (rest, Statement::DailyCount(date))
        }

        "can_create" => (rest, Statement::CanCreate),

        "set_daily_limit" => {
            let (rest, limit) = args(parse_number)(rest)?;
            (rest, Statement::SetDailyLimit(limit))
        }

        _ => return Err(nom::Err::Error((input, ErrorKind::Tag))),
    };

    Ok((rest, statement))
}

pub fn parse_line(input: &str) -> Option<Statement> {
    let input = input.trim();
    let (rest, statement) = parse_statement(input).ok()?;

    if rest.is_empty() {
        Some(statement)
    } else {
        None
    }
}
