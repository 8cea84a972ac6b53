// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod collections;
pub mod counters;
pub mod flashcards;
pub mod reviews;
pub mod sets;
pub mod users;
