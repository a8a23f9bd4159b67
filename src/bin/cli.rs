use clap::Parser;
use sheet_review::config;
use sheet_review::downloader::{export_file_name, to_xlsx};
use sheet_review::loader::load_file;
use sheet_review::review::{self, Command, Outcome};
use sheet_review::session::{APPROVAL_COLUMN, Session};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Review the rows of an Excel sheet from the terminal
#[derive(Parser, Debug)]
#[command(name = "review-cli", version)]
struct Args {
    /// Workbook to review (.xlsx or .xls)
    file: PathBuf,

    /// Sheet to review; the first sheet by default
    #[arg(long)]
    sheet: Option<String>,

    /// Where `export` writes when no path is given
    #[arg(long)]
    output: Option<PathBuf>,
}

/// What a line of input asks for
#[derive(Debug, PartialEq)]
enum Input {
    Review(Command),
    Toggle,
    Summary,
    Preview,
    Sheets,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("invalid command".to_string());
    };
    let arg = parts.next();

    let input = match word {
        "f" | "first" => Input::Review(Command::First),
        "p" | "prev" | "previous" => Input::Review(Command::Previous),
        "n" | "next" => Input::Review(Command::Next),
        "l" | "last" => Input::Review(Command::Last),
        "j" | "jump" => {
            let row = arg
                .and_then(|a| a.parse::<i64>().ok())
                .ok_or("usage: jump <row>")?;
            Input::Review(Command::JumpTo(row))
        }
        "yes" | "no" => Input::Review(Command::SetApproval(word.to_string())),
        "t" | "toggle" => Input::Toggle,
        "s" | "summary" => Input::Summary,
        "v" | "preview" => Input::Preview,
        "sheets" => Input::Sheets,
        "w" | "export" => Input::Export(arg.map(PathBuf::from)),
        "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => return Err("invalid command".to_string()),
    };
    Ok(input)
}

fn print_help() {
    println!("Commands:");
    println!("  f, first          Go to the first row");
    println!("  p, prev           Go to the previous row");
    println!("  n, next           Go to the next row");
    println!("  l, last           Go to the last row");
    println!("  j, jump <row>     Go to a row number (clamped)");
    println!("  yes | no          Set the approval of the current row");
    println!("  t, toggle         Flip the approval of the current row");
    println!("  s, summary        Show approval counts");
    println!("  v, preview        Print the whole table");
    println!("  sheets            List the sheets of the workbook");
    println!("  w, export [path]  Write the updated workbook");
    println!("  q                 Quit");
}

fn display_row(session: &Session) {
    let nav = review::navigation(session);
    let progress = review::progress(session).unwrap_or(0.0);
    println!();
    println!(
        "Row {} of {}  ({:.1}%)",
        nav.position + 1,
        nav.row_count,
        progress * 100.0
    );
    for (name, value) in session.working().named_cells(session.cursor()) {
        if name != APPROVAL_COLUMN {
            println!("  {:<20} {}", name, value);
        }
    }
    if let Ok(approval) = review::current_approval(session) {
        println!("  {:<20} {}", APPROVAL_COLUMN, approval);
    }
}

fn display_summary(session: &Session) {
    let summary = review::summary(session);
    println!(
        "Approved: {}  Not approved: {}  Changes: {}",
        summary.approved, summary.not_approved, summary.changed
    );
}

fn display_table(session: &Session) {
    let table = session.working();
    println!("#\t{}", table.columns().join("\t"));
    for (i, record) in table.rows().iter().enumerate() {
        let cells: Vec<String> = record.values().iter().map(ToString::to_string).collect();
        let marker = if i == session.cursor() { ">" } else { "" };
        println!("{}{}\t{}", marker, i + 1, cells.join("\t"));
    }
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("sheet.xlsx");
    input.with_file_name(export_file_name(name))
}

/// Encode the working table and write it to `path`
fn export(session: &Session, sheet: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = to_xlsx(session.working(), sheet)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    config::init_logging("warn");

    let decoded = match load_file(&args.file, args.sheet.as_deref()) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("Error reading Excel file: {}", e);
            eprintln!("Please make sure the file is a valid Excel file (.xlsx or .xls)");
            std::process::exit(1);
        }
    };
    let sheet = decoded.sheet;
    let sheet_names = decoded.sheet_names;
    let mut session = Session::load(decoded.table);
    let output = args.output.unwrap_or_else(|| default_output(&args.file));

    if session.approval_column_added() {
        println!("Added '{}' column with default 'no' values", APPROVAL_COLUMN);
    }
    if session.is_empty() {
        println!("The selected sheet is empty.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut status = String::from("ok");
    let mut show = true;
    loop {
        if show {
            display_row(&session);
        }
        show = false;

        print!("({}) > ", status);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = match parse_input(line.trim()) {
            Ok(input) => input,
            Err(message) => {
                status = message;
                continue;
            }
        };

        status = String::from("ok");
        match input {
            Input::Review(command) => match review::apply(&mut session, command) {
                Ok(Outcome::ApprovalUpdated(approval)) => {
                    status = format!("approval set to '{}'", approval);
                    show = true;
                }
                Ok(Outcome::ApprovalUnchanged) => status = String::from("unchanged"),
                Ok(Outcome::Moved { .. }) => show = true,
                Err(e) => status = e.to_string(),
            },
            Input::Toggle => match review::toggle_current_approval(&mut session) {
                Ok(approval) => {
                    status = format!("approval set to '{}'", approval);
                    show = true;
                }
                Err(e) => status = e.to_string(),
            },
            Input::Summary => display_summary(&session),
            Input::Preview => display_table(&session),
            Input::Sheets => {
                for name in &sheet_names {
                    let marker = if *name == sheet { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
            Input::Export(path) => {
                let path = path.unwrap_or_else(|| output.clone());
                // Errors only update the status line
                status = match export(&session, &sheet, &path) {
                    Ok(()) => format!("wrote {}", path.display()),
                    Err(e) => format!("export to {} failed: {}", path.display(), e),
                };
            }
            Input::Help => print_help(),
            Input::Quit => break,
        }
    }

    display_summary(&session);
    Ok(())
}
