use imgfolio_core::Msg;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch(String),
    Toggle(Vec<usize>),
    All,
    None,
    List,
    Selected,
    Download,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  fetch <url>      list the images on a page (clears the selection)
  toggle <n>...    select/unselect images by gallery number
  all | none       select every image / clear the selection
  list             show the gallery
  selected         show the selection in page order
  download         save the selection as a PDF, one image per page
  help             show this text
  quit             exit";

pub fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Command::Empty;
    };
    let rest: Vec<&str> = parts.collect();

    match head.to_ascii_lowercase().as_str() {
        "fetch" | "f" | "open" => match rest.as_slice() {
            [url] => Command::Fetch((*url).to_string()),
            _ => Command::Invalid("usage: fetch <url>".to_string()),
        },
        "toggle" | "t" | "select" | "s" => parse_indexes(&rest),
        "all" => Command::All,
        "none" | "clear" => Command::None,
        "list" | "ls" | "l" => Command::List,
        "selected" | "sel" => Command::Selected,
        "download" | "pdf" | "d" => Command::Download,
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        // A bare URL is shorthand for `fetch`.
        _ if rest.is_empty() && head.contains("://") => Command::Fetch(head.to_string()),
        // So is a bare list of numbers for `toggle`.
        _ if head.chars().all(|c| c.is_ascii_digit() || c == ',') => {
            let mut all = vec![head];
            all.extend(rest);
            parse_indexes(&all)
        }
        other => Command::Invalid(format!("unknown command {other:?}, try `help`")),
    }
}

fn parse_indexes(args: &[&str]) -> Command {
    let mut indexes = Vec::new();
    for token in args.iter().flat_map(|a| a.split(',')).filter(|t| !t.is_empty()) {
        match token.parse::<usize>() {
            Ok(n) if n > 0 => indexes.push(n),
            _ => return Command::Invalid(format!("not an image number: {token:?}")),
        }
    }
    if indexes.is_empty() {
        Command::Invalid("usage: toggle <n>...".to_string())
    } else {
        Command::Toggle(indexes)
    }
}

impl Command {
    /// Messages the command feeds into the state machine.
    pub fn into_msgs(self) -> Vec<Msg> {
        match self {
            Command::Fetch(url) => vec![Msg::InputChanged(url), Msg::FetchSubmitted],
            Command::Toggle(indexes) => indexes.into_iter().map(Msg::ImageToggledAt).collect(),
            Command::All => vec![Msg::SelectAll],
            Command::None => vec![Msg::ClearSelection],
            Command::Download => vec![Msg::DownloadClicked],
            Command::List
            | Command::Selected
            | Command::Help
            | Command::Quit
            | Command::Empty
            | Command::Invalid(_) => Vec::new(),
        }
    }
}
