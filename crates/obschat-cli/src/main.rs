// obschat-cli: terminal frontend for obschat
// Argument parsing, transcript views, streaming output

mod cli;
mod output;
mod sink;

use obschat_core::{Obschat, PromptOptions};
use output::OutputHandler;
use sink::CliResponseSink;
use std::io::{self, ErrorKind, IsTerminal, Read};

fn read_stdin_prompt() -> io::Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "no prompt given; pass it as an argument or pipe it on stdin",
        ));
    }
    let mut prompt = String::new();
    stdin.read_to_string(&mut prompt)?;
    Ok(prompt)
}

fn show_log(obschat: &Obschat, output: &OutputHandler, session: &str, last: usize) -> io::Result<()> {
    let entries = obschat.read_transcript(session)?;
    let skip = if last > 0 && entries.len() > last {
        entries.len() - last
    } else {
        0
    };
    for entry in &entries[skip..] {
        output.emit_entry(entry);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = cli::parse();

    let obschat = Obschat::load()?;
    let config = obschat.resolve_config(&args.session)?;
    let verbose = args.verbose || config.verbose;
    let output = OutputHandler::new(verbose);

    if args.list_sessions {
        for name in obschat.list_sessions()? {
            output.result(&name);
        }
        return Ok(());
    }

    if args.catalog {
        for record in obschat.catalog(&config)? {
            output.result(&format!("{:>6}  {}", record.norad_id, record.name));
        }
        return Ok(());
    }

    if let Some(last) = args.log {
        return show_log(&obschat, &output, &args.session, last);
    }

    if let Some(prompt) = &args.system_prompt {
        obschat.set_system_prompt(&args.session, prompt)?;
        output.diagnostic(&format!("[System prompt set for session '{}']", args.session));
        if args.prompt.is_none() {
            return Ok(());
        }
    }

    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => read_stdin_prompt()?,
    };

    let options = PromptOptions::new(verbose, &args.debug, args.no_tools);
    let mut response_sink = CliResponseSink::new(&output, verbose);
    obschat
        .send_prompt(&args.session, &prompt, &config, &options, &mut response_sink)
        .await
}
