use std::{env, fs};

use quizmaster_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

/// Emit the OpenAPI document as pretty JSON, to stdout or to the file given
/// as the first argument.
fn main() {
    let json = ApiDoc::openapi().to_pretty_json().unwrap();
    match env::args().nth(1) {
        Some(path) => fs::write(&path, json).unwrap(),
        None => println!("{json}"),
    }
}
