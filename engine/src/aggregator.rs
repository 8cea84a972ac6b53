// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::Engine;
use anyhow::Error;
use controller::{error::ErrorKind, review, Controller, NewReview, Review, ReviewKind};

/// Outcome of recomputing the average rating of a parent
#[derive(Debug, Clone, PartialEq)]
pub enum Recompute {
    Updated(f64),
    /// The parent is gone, there was nothing to update
    ParentMissing,
    /// The review change was committed but the average could not be stored
    Failed(String),
}

impl Recompute {
    pub fn average(&self) -> Option<f64> {
        match self {
            Self::Updated(average) => Some(*average),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewChange {
    pub review: Review,
    pub average: Recompute,
}

impl<'a, C> Engine<'a, C>
where
    C: Controller,
{
    /// Store the mean of every rating on the parent (0 without reviews) into
    /// its `average_rating`, holding the parent row lock while doing so.
    pub fn recompute_average(&self, kind: ReviewKind, parent_id: i32) -> Result<Recompute, Error> {
        self.controller.transaction(|| {
            if !self.controller.lock_parent(kind, parent_id)? {
                log::warn!("Can't recompute average, {}({}) doesn't exist", kind, parent_id);
                return Ok(Recompute::ParentMissing);
            }

            let average = self
                .controller
                .average_rating(kind, parent_id)?
                .unwrap_or(0.0);

            if !self.controller.set_average_rating(kind, parent_id, average)? {
                log::warn!("{}({}) disappeared before its average was stored", kind, parent_id);
                return Ok(Recompute::ParentMissing);
            }

            log::debug!("Average rating of {}({}) is now {:.3}", kind, parent_id, average);
            Ok(Recompute::Updated(average))
        })
    }

    pub fn create_review(&self, proto: &NewReview) -> Result<ReviewChange, Error> {
        self.mutate_review(proto.kind, proto.parent_id, || {
            self.controller.insert_review(proto)
        })
    }

    /// Change rating and text of a review, only its author may do it
    pub fn update_review(
        &self,
        actor: i32,
        kind: ReviewKind,
        review_id: i32,
        rating: i32,
        text: &str,
    ) -> Result<ReviewChange, Error> {
        review::validate(rating, text)?;

        let stored = self.controller.review_by_id(kind, review_id)?;
        if stored.user_id != actor {
            return Err(ErrorKind::Forbidden(actor, "update this review").into());
        }

        self.mutate_review(kind, stored.parent_id, || {
            self.controller.update_review(kind, review_id, rating, text)
        })
    }

    /// Delete a review, allowed to its author and to administrators
    pub fn delete_review(
        &self,
        actor: i32,
        kind: ReviewKind,
        review_id: i32,
    ) -> Result<ReviewChange, Error> {
        // A review never moves between parents, so its parent id taken now is
        // the one to recompute once the row is gone
        let stored = self.controller.review_by_id(kind, review_id)?;
        if stored.user_id != actor && !self.controller.user_role(actor)?.is_admin() {
            return Err(ErrorKind::Forbidden(actor, "delete this review").into());
        }

        self.mutate_review(kind, stored.parent_id, || {
            self.controller.remove_review(kind, review_id)
        })
    }

    /// Recompute the average of every parent of `kind`, returns how many were updated
    pub fn recompute_all(&self, kind: ReviewKind) -> Result<usize, Error> {
        let mut updated = 0;

        for chunk in self
            .controller
            .parents_by_chunks(kind, self.config.recompute_chunk_size)
        {
            let chunk = chunk?;
            log::info!("Recomputing averages for {} {}s", chunk.len(), kind);
            for parent_id in chunk {
                if let Recompute::Updated(_) = self.recompute_average(kind, parent_id)? {
                    updated += 1;
                }
            }
        }

        Ok(updated)
    }

    fn mutate_review<F>(
        &self,
        kind: ReviewKind,
        parent_id: i32,
        mutation: F,
    ) -> Result<ReviewChange, Error>
    where
        F: FnOnce() -> Result<Review, Error>,
    {
        if self.config.recompute_in_transaction {
            // Parent lock first, concurrent mutations on the same parent queue here
            return self.controller.transaction(|| {
                self.controller.lock_parent(kind, parent_id)?;
                let review = mutation()?;
                let average = self.recompute_average(kind, parent_id).map_err(|e| {
                    log::error!("Failed to recompute average of {}({}): {}", kind, parent_id, e);
                    e
                })?;

                Ok(ReviewChange { review, average })
            });
        }

        let review = self.controller.transaction(mutation)?;
        let average = match self.recompute_average(kind, parent_id) {
            Ok(average) => average,
            Err(e) => {
                log::error!(
                    "Average of {}({}) left stale after review({}): {}",
                    kind,
                    parent_id,
                    review.id,
                    e
                );
                Recompute::Failed(e.to_string())
            }
        };

        Ok(ReviewChange { review, average })
    }
}
