use crate::render::render_table;
use anyhow::Result;
use common::QueryEngine;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "duckask> ";

const HELP: &str = "\
type a question to query the loaded tables.
  \\schema   show the current schema
  \\files    list loadable files
  \\sample   load the sample data
  \\help     show this message
  \\quit     exit";

/// commands understood by the shell besides plain questions
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    Schema,
    Files,
    Sample,
    Help,
    Quit,
    Unknown(&'a str),
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }

    match line.strip_prefix('\\') {
        Some("schema") => Input::Schema,
        Some("files") => Input::Files,
        Some("sample") => Input::Sample,
        Some("help") | Some("?") => Input::Help,
        Some("quit") | Some("q") | Some("exit") => Input::Quit,
        Some(other) => Input::Unknown(other),
        None => Input::Question(line),
    }
}

pub async fn run(engine: QueryEngine) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("{}", HELP);

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = parse_input(&line);
        if input != Input::Blank {
            let _ = editor.add_history_entry(line.as_str());
        }

        match input {
            Input::Blank => continue,
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Unknown(cmd) => println!("unknown command: \\{}", cmd),
            Input::Files => match engine.list_loadable_files() {
                Ok(files) => files.iter().for_each(|f| println!("{}", f)),
                Err(e) => println!("error [{}]: {}", e.kind(), e),
            },
            Input::Schema => match engine.schema().await {
                Ok(schema) => println!("{}", common::agent::render_schema(&schema)),
                Err(e) => println!("error [{}]: {}", e.kind(), e),
            },
            Input::Sample => match engine.load_sample_data().await {
                Ok(schema) => println!("loaded {} tables", schema.table_count()),
                Err(e) => println!("error [{}]: {}", e.kind(), e),
            },
            Input::Question(question) => match engine.answer(question).await {
                Ok(answer) => println!("{}", render_table(&answer)),
                Err(e) => println!("error [{}]: {}", e.kind(), e),
            },
        }
    }

    Ok(())
}
