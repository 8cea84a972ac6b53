// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use prettytable::{cell, format::consts::FORMAT_NO_LINESEP, row, table, Cell, Row, Table};
use std::collections::HashMap;

pub trait Entity {
    type Id;

    fn get_id(&self) -> Self::Id;
    fn get_data(&self) -> HashMap<String, String> {
        Default::default()
    }
}

pub trait ToTable {
    fn to_table(&self) -> Table;
}

fn sorted_data<E: Entity>(entity: &E) -> Vec<(String, String)> {
    let mut data: Vec<_> = entity.get_data().into_iter().collect();
    data.sort();
    data
}

impl<I: ToString, E: Entity<Id = I>> ToTable for E {
    fn to_table(&self) -> Table {
        let mut table = table![["id", self.get_id()]];

        for (key, val) in sorted_data(self) {
            table.add_row(row![key, val]);
        }

        table.set_format(*FORMAT_NO_LINESEP);
        table
    }
}

impl<I: ToString, E: Entity<Id = I>> ToTable for [E] {
    fn to_table(&self) -> Table {
        let mut table = Table::new();

        // Header comes from the first entity, all of them share the same keys
        if let Some(first) = self.first() {
            let mut header = vec![Cell::new("id")];
            header.extend(sorted_data(first).iter().map(|(key, _)| Cell::new(key)));
            table.set_titles(Row::new(header));
        }

        for entity in self {
            let mut cells = vec![Cell::new(&entity.get_id().to_string())];
            cells.extend(sorted_data(entity).iter().map(|(_, val)| Cell::new(val)));
            table.add_row(Row::new(cells));
        }

        table.set_format(*FORMAT_NO_LINESEP);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_macros::hash_map;

    struct Deck {
        id: i32,
        name: &'static str,
    }

    impl Entity for Deck {
        type Id = i32;

        fn get_id(&self) -> Self::Id {
            self.id
        }

        fn get_data(&self) -> HashMap<String, String> {
            hash_map! {
                "name".into() => self.name.to_string(),
                "cards".into() => "12".to_string(),
            }
        }
    }

    #[test]
    fn single_entity_rows_are_sorted() {
        let table = Deck { id: 7, name: "Kanji" }.to_table();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get_row(1).unwrap().get_cell(0).unwrap().get_content(), "cards");
        assert_eq!(table.get_row(2).unwrap().get_cell(1).unwrap().get_content(), "Kanji");
    }

    #[test]
    fn slice_has_one_row_per_entity() {
        let decks = [Deck { id: 1, name: "A" }, Deck { id: 2, name: "B" }];
        let table = decks[..].to_table();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get_row(1).unwrap().get_cell(0).unwrap().get_content(), "2");
    }
}
