// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use config::Config;
use controller::ReviewKind;
use engine::Engine;
use flashcards::FlashcardsController;
use std::collections::HashMap;

fn main() -> Result<(), Error> {
    let vars: HashMap<String, String> = dotenv::vars().collect();

    let config = match vars.get("CONFIG") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let controller = match vars.get("DATABASE_URL") {
        Some(url) => FlashcardsController::with_url(url)?,
        None => FlashcardsController::from_config(&config, "flashcards")?,
    };

    let engine = Engine::with_config(&controller, &config);
    for kind in &[ReviewKind::FlashcardSet, ReviewKind::Collection] {
        let updated = engine.recompute_all(*kind)?;
        println!("Updated the average rating of {} {}s", updated, kind);
    }

    Ok(())
}
