//! Comma-splitting REPL: reads lines, prints the cells, completes by repetition.
//!
//! Set `RAWLINE_LOG=/tmp/rawline.log` (and `RAWLINE_DEBUG=1`) to watch key decoding.

use std::process::ExitCode;

use rawline::{
    install_signal_handlers, logging, Color, EnvConfig, Prompt, PromptError, TerminalOutputExt,
};

const PROMPT: &str = "csv> ";

/// `line` repeated `times` times, joined by underscores, with trailing underscores dropped.
fn repeat_line(line: &str, times: usize) -> String {
    format!("{line}_")
        .repeat(times)
        .trim_end_matches('_')
        .to_string()
}

fn complete(line: &str) -> Vec<String> {
    (2..=4).map(|times| repeat_line(line, times)).collect()
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EnvConfig::from_env();
    if let Err(err) = logging::init_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let mut prompt = Prompt::from_config(&config);
    prompt.set_completion_fn(complete);

    let restorer = prompt.terminal_mut().mode_restorer()?;
    let _signals = install_signal_handlers(move || {
        let _ = restorer.restore();
    })?;

    let terminal = prompt.terminal_mut();
    terminal.set_fg(Color::Purple)?;
    terminal.puts("'CSV' parser.")?;
    terminal.reset()?;
    terminal.puts(" Press Ctrl-D to exit, Tab to complete.")?;
    terminal.newline()?;

    loop {
        let line = match prompt.prompt(PROMPT) {
            Ok(line) => line,
            Err(PromptError::Aborted) => {
                let terminal = prompt.terminal_mut();
                terminal.puts("^C")?;
                terminal.newline()?;
                continue;
            }
            Err(PromptError::Ended) => {
                prompt.terminal_mut().newline()?;
                break;
            }
            Err(err) => return Err(err.into()),
        };
        log::info!("committed {line:?}");
        prompt.append_history(line.clone());

        let terminal = prompt.terminal_mut();
        for (index, cell) in line.split(',').enumerate() {
            terminal.set_fg(Color::Gray)?;
            terminal.print_fmt(format_args!("{:>3}", index + 1))?;
            terminal.reset()?;
            terminal.print_fmt(format_args!(" : {cell}"))?;
            terminal.newline()?;
        }
    }

    log::debug!("history on exit:\n{}", prompt.export_history());
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rawline-repl: {err}");
            ExitCode::FAILURE
        }
    }
}
