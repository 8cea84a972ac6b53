// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::error::ErrorKind;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SearchBy {
    Id(i32),
    Name(String),
}

impl SearchBy {
    pub fn id(id: i32) -> Self {
        Self::Id(id)
    }

    pub fn name(name: &str) -> Self {
        Self::Name(name.into())
    }

    /// The error to report when nothing matched
    pub fn not_found(&self) -> ErrorKind {
        match self {
            Self::Id(id) => ErrorKind::NotFoundById(id.to_string()),
            Self::Name(name) => ErrorKind::NotFoundByName(name.clone()),
        }
    }
}

impl Display for SearchBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBy::Id(id) => write!(f, "id({})", id),
            SearchBy::Name(name) => write!(f, "name({})", name),
        }
    }
}
