// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use chrono::NaiveDate;
use nom::bytes::complete::{tag, take_till1, take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{map_res, opt, recognize};
use nom::sequence::{delimited, pair};
use nom::IResult;
use std::convert::TryFrom;

pub(crate) fn parse_ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

pub(crate) fn parse_string(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_till1(|c: char| c == '\''), char('\''))(input)
}

pub(crate) fn parse_number(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

pub(crate) fn parse_id(input: &str) -> IResult<&str, i32> {
    map_res(parse_number, |n: i64| i32::try_from(n))(input)
}

pub(crate) fn parse_date(input: &str) -> IResult<&str, NaiveDate> {
    map_res(parse_string, |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d"))(input)
}

pub(crate) fn parse_separator(input: &str) -> IResult<&str, &str> {
    delimited(
        take_while(|c: char| c == ' '),
        tag(","),
        take_while(|c: char| c == ' '),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_idents() {
        let parsed = parse_ident("query_user(id(3))");
        let expected = ("(id(3))", "query_user");

        assert_eq!(parsed, Ok(expected));

        let parsed = parse_ident("can_create now");
        let expected = (" now", "can_create");

        assert_eq!(parsed, Ok(expected));
    }

    #[test]
    fn test_parse_string() {
        let parsed = parse_string("'holo, cómo estás?'");
        let expected = ("", "holo, cómo estás?");

        assert_eq!(parsed, Ok(expected));

        let parsed = parse_string("'Kanji N5' #wed2@ws");
        let expected = (" #wed2@ws", "Kanji N5");

        assert_eq!(parsed, Ok(expected));
        assert!(parse_string("''").is_err());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_number("12345"), Ok(("", 12345)));
        assert_eq!(parse_number("-7)"), Ok((")", -7)));
        assert_eq!(parse_number("12c3"), Ok(("c3", 12)));
        assert!(parse_number("-").is_err());
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_id("42"), Ok(("", 42)));
        assert!(parse_id("99999999999").is_err());
    }

    #[test]
    fn test_parse_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert_eq!(parse_date("'2024-05-01'"), Ok(("", expected)));
        assert!(parse_date("'2024-13-01'").is_err());
    }
}
