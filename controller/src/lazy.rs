// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{Controller, Result, ReviewKind};

/// Walks every parent id of one review kind, `chunk_size` ids at a time.
/// Stops after the first empty chunk, a store error is yielded once and ends
/// the walk.
pub struct LazyParentChunks<'a, C> {
    pub(crate) kind: ReviewKind,
    pub(crate) curr_offset: usize,
    pub(crate) chunk_size: usize,
    pub(crate) finished: bool,
    pub(crate) controller: &'a C,
}

impl<'a, C> Iterator for LazyParentChunks<'a, C>
where
    C: Controller,
{
    type Item = Result<Vec<i32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let parents = match self
            .controller
            .parents_offset_limit(self.kind, self.curr_offset, self.chunk_size)
        {
            Ok(parents) => parents,
            Err(e) => {
                log::error!("Failed to fetch {} chunk at {}: {}", self.kind, self.curr_offset, e);
                self.finished = true;
                return Some(Err(e));
            }
        };

        self.curr_offset += self.chunk_size;
        if parents.is_empty() {
            self.finished = true;
            None
        } else {
            Some(Ok(parents))
        }
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.curr_offset = n * self.chunk_size;
        self.finished = false;
        self.next()
    }
}
