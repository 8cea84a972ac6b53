// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod parser;

use anyhow::Error;
use clap::{App, Arg};
use config::Config;
use controller::{
    error::ErrorKind, Controller, Entity, NewCollection, NewFlashcard, NewReview, NewSet, NewUser,
    ToTable,
};
use engine::{Engine, Recompute};
use flashcards::FlashcardsController;
use log::LevelFilter;
use memory::MemoryController;
use parser::{Database, Statement};
use simplelog::{TermLogger, TerminalMode};

macro_rules! prompt {
    ($ed:ident) => {{
        prompt!($ed, "")
    }};

    ($ed:ident, $db:expr) => {{
        use rustyline::error::ReadlineError;

        let msg = if $db.is_empty() {
            format!("{}", PROMPT)
        } else {
            format!("({}) {}", $db, PROMPT)
        };

        match $ed.readline(&msg) {
            Ok(line) => {
                $ed.add_history_entry(line.as_str());
                Ok(line)
            }

            Err(ReadlineError::Interrupted) => {
                continue;
            }

            Err(ReadlineError::Eof) => {
                if $db.is_empty() {
                    println!("Exiting...Good bye!");
                } else {
                    println!("Disconnecting from {}", $db);
                }

                break;
            }

            Err(e) => Err(e),
        }
    }};
}

// Statements that act on behalf of someone need a logged in user
macro_rules! acting_user {
    ($user:expr) => {
        match $user {
            Some(id) => id,
            None => {
                println!("Login first with login(id(..)) or login(name(..))");
                continue;
            }
        }
    };
}

fn print_entities<E: Entity<Id = i32>>(found: Result<Vec<E>, Error>) {
    match found {
        Ok(entities) => {
            for entity in entities {
                println!("{}", entity.to_table());
            }
        }
        Err(e) => println!("{}", e),
    }
}

fn print_recompute(kind: impl std::fmt::Display, id: i32, recompute: &Recompute) {
    match recompute {
        Recompute::Updated(average) => {
            println!("Average rating of {}({}) is now {:.2}", kind, id, average)
        }
        Recompute::ParentMissing => println!("{}({}) doesn't exist", kind, id),
        Recompute::Failed(e) => println!("Average of {}({}) is stale: {}", kind, id, e),
    }
}

fn database_connected_prompt<C>(controller: C, name: &str, config: &Config) -> Result<(), Error>
where
    C: Controller,
{
    let engine = Engine::with_config(&controller, config);
    let mut rl = rustyline::Editor::<()>::new();
    let mut user: Option<i32> = None;

    loop {
        let opt: String = prompt!(rl, name)?;

        match opt.trim() {
            "q" | "quit" => {
                println!("Bye!");
                break;
            }

            "d" | "disconnect" => {
                println!("Disconnecting from database {}", name);
                break;
            }

            "v" | "version" => {
                println!("version: {}", VERSION);
            }

            "?" | "h" | "help" => print_connected_help(),

            empty if empty.is_empty() => {}

            line => match parser::parse_line(line) {
                Some(stmt) => match stmt {
                    Statement::Connect(_) => println!("Invalid in this context!"),

                    Statement::CreateUser(username, role) => {
                        match controller.insert_user(&NewUser { username, role }) {
                            Ok(created) => println!("{}", created.to_table()),
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::Login(by) => match controller.users_by(&by) {
                        Ok(users) => {
                            let id = users[0].get_id();
                            println!("Acting as user({})", id);
                            user = Some(id);
                        }
                        Err(e) => println!("{}", e),
                    },

                    Statement::QueryUser(by) => print_entities(controller.users_by(&by)),
                    Statement::QuerySet(by) => print_entities(controller.sets_by(&by)),
                    Statement::QueryCollection(by) => {
                        print_entities(controller.collections_by(&by))
                    }

                    Statement::QueryReviews(kind, parent_id) => {
                        match controller.reviews_of(kind, parent_id) {
                            Ok(reviews) if reviews.is_empty() => {
                                println!("No reviews found for {}({})", kind, parent_id)
                            }
                            Ok(reviews) => println!("{}", reviews.to_table()),
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::CreateSet(name, description) => {
                        let proto = NewSet {
                            user_id: acting_user!(user),
                            name,
                            description,
                            private: false,
                        };

                        match engine.create_set(&proto) {
                            Ok(created) => {
                                println!("{}", created.set.to_table());
                                if let Some(total) = created.created_today {
                                    println!("Sets created today: {}", total);
                                }
                            }
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::CreateCollection(name) => {
                        let proto = NewCollection {
                            user_id: acting_user!(user),
                            name,
                        };

                        match controller.insert_collection(&proto) {
                            Ok(created) => println!("{}", created.to_table()),
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::DeleteSet(id) => {
                        let actor = acting_user!(user);
                        let removed = controller.user_role(actor).and_then(|role| {
                            if role.is_admin() {
                                controller.remove_set(id)
                            } else {
                                Err(ErrorKind::Forbidden(actor, "delete sets").into())
                            }
                        });

                        match removed {
                            Ok(set) => println!("Deleted set({}) and its reviews", set.get_id()),
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::DeleteCollection(id) => {
                        let actor = acting_user!(user);
                        let removed = controller.user_role(actor).and_then(|role| {
                            if role.is_admin() {
                                controller.remove_collection(id)
                            } else {
                                Err(ErrorKind::Forbidden(actor, "delete collections").into())
                            }
                        });

                        match removed {
                            Ok(collection) => {
                                println!("Deleted collection({}) and its reviews", collection.get_id())
                            }
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::AddFlashcard(set_id, term, definition) => {
                        let proto = NewFlashcard {
                            set_id,
                            term,
                            definition,
                        };

                        match controller.insert_flashcard(&proto) {
                            Ok(card) => println!("{}", card.to_table()),
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::QueryFlashcards(set_id) => match controller.flashcards_of(set_id) {
                        Ok(cards) if cards.is_empty() => println!("Set({}) has no flashcards", set_id),
                        Ok(cards) => println!("{}", cards.to_table()),
                        Err(e) => println!("{}", e),
                    },

                    Statement::Review(kind, parent_id, rating, text) => {
                        let created = NewReview::new(kind, parent_id, acting_user!(user), rating, &text)
                            .map_err(Error::from)
                            .and_then(|proto| engine.create_review(&proto));

                        match created {
                            Ok(change) => {
                                println!("{}", change.review.to_table());
                                print_recompute(kind, parent_id, &change.average);
                            }
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::UpdateReview(kind, id, rating, text) => {
                        match engine.update_review(acting_user!(user), kind, id, rating, &text) {
                            Ok(change) => {
                                println!("{}", change.review.to_table());
                                print_recompute(kind, change.review.parent_id, &change.average);
                            }
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::DeleteReview(kind, id) => {
                        match engine.delete_review(acting_user!(user), kind, id) {
                            Ok(change) => {
                                println!("Deleted review({})", change.review.id);
                                print_recompute(kind, change.review.parent_id, &change.average);
                            }
                            Err(e) => println!("{}", e),
                        }
                    }

                    Statement::Recompute(kind, Some(id)) => match engine.recompute_average(kind, id) {
                        Ok(recompute) => print_recompute(kind, id, &recompute),
                        Err(e) => println!("{}", e),
                    },

                    Statement::Recompute(kind, None) => match engine.recompute_all(kind) {
                        Ok(updated) => println!("Updated {} {}s", updated, kind),
                        Err(e) => println!("{}", e),
                    },

                    Statement::DailyLimit => match engine.daily_limit() {
                        Ok(limit) => println!("Daily limit is {}", limit),
                        Err(e) => println!("{}", e),
                    },

                    Statement::DailyCount(date) => match engine.daily_count(date) {
                        Ok(count) => println!("{} sets created", count),
                        Err(e) => println!("{}", e),
                    },

                    Statement::CanCreate => match engine.can_create(None) {
                        Ok(true) => println!("Sets can still be created today"),
                        Ok(false) => println!("Daily limit reached"),
                        Err(e) => println!("{}", e),
                    },

                    Statement::SetDailyLimit(limit) => {
                        match engine.update_daily_limit(acting_user!(user), limit) {
                            Ok(true) => println!("Daily limit set to {}", limit),
                            Ok(false) => println!("No daily limit setting to update"),
                            Err(e) => println!("{}", e),
                        }
                    }
                },

                None => println!("Invalid syntax"),
            },
        }
    }

    Ok(())
}

fn print_connected_help() {
    println!("Connected help:");
    println!("create_user('name'[, admin])            Create a user");
    println!("login(id(3)) | login(name(ana))         Act as an existing user");
    println!("query_user | query_set | query_collection (id(..) | name(..))");
    println!("query_reviews(set | collection, id)     List reviews of a parent");
    println!("create_set('name'[, 'description'])     Create a set within today's quota");
    println!("create_collection('name')               Create a collection");
    println!("delete_set(id) | delete_collection(id)  Delete with its reviews (admins)");
    println!("add_flashcard(set, 'term', 'definition') | query_flashcards(set)");
    println!("review(kind, parent, rating, 'text')    Review a set or collection");
    println!("update_review(kind, id, rating, 'text') Change your review");
    println!("delete_review(kind, id)                 Delete a review");
    println!("recompute(kind[, id])                   Recompute average ratings");
    println!("daily_limit | daily_count[('YYYY-MM-DD')] | can_create | set_daily_limit(n)");
    println!("d | disconnect                          Leave this database");
}

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PROMPT: &str = ">> ";

fn init_logger(config: &Config, verbosity: u64) -> Result<(), Error> {
    let configured: LevelFilter = config.log.level.parse().unwrap_or(LevelFilter::Info);
    let level = match verbosity {
        0 => configured,
        1 => configured.max(LevelFilter::Debug),
        _ => LevelFilter::Trace,
    };

    TermLogger::init(level, simplelog::Config::default(), TerminalMode::Mixed)?;
    Ok(())
}

fn main() -> Result<(), Error> {
    let matches = App::new("flashcard-study")
        .version(VERSION)
        .about("Flashcard sets, reviews and daily creation quota")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Raise the log level"),
        )
        .get_matches();

    let config = match matches.value_of("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_logger(&config, matches.occurrences_of("verbose"))?;

    println!("Welcome to flashcard-study {}", VERSION);
    let mut rl = rustyline::Editor::<()>::new();

    loop {
        let opt: String = prompt!(rl)?;

        match opt.trim() {
            "?" | "h" | "help" => {
                println!("Main help:");
                println!("h | help           Shows this help");
                println!("q | quit           Quit");
                println!("c | connect <DB>   Connect to DB (flashcards or memory)");
            }

            "q" | "quit" => {
                println!("Bye!");
                break;
            }

            "v" | "version" => {
                println!("version: {}", VERSION);
            }

            empty if empty.is_empty() => {}

            line => match parser::parse_line(line) {
                Some(stmt) => {
                    if let Statement::Connect(db) = stmt {
                        match db {
                            Database::Flashcards => {
                                match FlashcardsController::from_config(&config, "flashcards") {
                                    Ok(controller) => {
                                        database_connected_prompt(controller, "flashcards", &config)?
                                    }
                                    Err(e) => println!("{}", e),
                                }
                            }
                            Database::Memory => database_connected_prompt(
                                MemoryController::new(config.limiter.fallback_daily_limit),
                                "memory",
                                &config,
                            )?,
                        }
                    } else {
                        println!("Invalid statement in this context!");
                    }
                }
                None => println!("Invalid syntax!"),
            },
        }
    }

    Ok(())
}
