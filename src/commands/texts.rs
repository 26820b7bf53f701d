//! Fixed reply texts.

pub const WELCOME: &str = "Hi! I'm the helper bot for the university's 3D campus building maps.\n\
Commands: /corpuses /gallery /news /resources /help";

pub const HELP: &str = "/corpuses - list of buildings\n\
/gallery - images\n\
/news - project progress\n\
/resources - useful links";

pub const NO_BUILDINGS: &str = "No buildings available.";

pub const ADD_USAGE: &str = "Format: /add Name | Description | path_to_image";

pub fn user_count(count: usize) -> String {
    format!("Total users: {count}")
}

pub fn model_added(name: &str) -> String {
    format!("✅ Added building {name}")
}
