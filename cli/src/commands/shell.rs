//! `waymark shell` - line-oriented interactive session

use super::{active_states, open_navigator, print_location, render_tree};
use crate::config::CliConfigLoader;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use waymark_core::{Navigator, Outcome};

const HELP: &str = "\
commands:
  go <path>              navigate (absolute or root-relative path)
  back | forward         move through the session history
  store <router> <json>  attach bookmark data to a router's current state
  url                    print the current URL
  tree                   print the router tree
  help                   show this help
  quit                   leave the shell";

/// Shell command parsed from one input line
#[derive(Debug, PartialEq)]
enum ShellCommand {
    Go(String),
    Back,
    Forward,
    Store { router: String, json: String },
    Url,
    Tree,
    Help,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "go" if !rest.is_empty() => ShellCommand::Go(rest.to_string()),
            "go" => return Err(anyhow!("usage: go <path>")),
            "back" => ShellCommand::Back,
            "forward" => ShellCommand::Forward,
            "store" => {
                let (router, json) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: store <router> <json>"))?;
                ShellCommand::Store {
                    router: router.to_string(),
                    json: json.trim().to_string(),
                }
            }
            "url" => ShellCommand::Url,
            "tree" => ShellCommand::Tree,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(anyhow!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

pub async fn shell_command(loader: CliConfigLoader) -> Result<()> {
    let navigator = open_navigator(&loader, None).await?;
    print_location(&navigator)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("error: {err}");
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        // errors are reported and the session goes on
        if let Err(err) = run(&navigator, command).await {
            println!("error: {err:#}");
        }
    }
    Ok(())
}

async fn run(navigator: &Navigator, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Go(path) => report(navigator, navigator.go(&path).await?),
        ShellCommand::Back => report(navigator, navigator.back().await?),
        ShellCommand::Forward => report(navigator, navigator.forward().await?),
        ShellCommand::Store { router, json } => {
            let handle = navigator
                .router(&router)
                .ok_or_else(|| anyhow!("no router named '{router}'"))?;
            let data: serde_json::Value =
                serde_json::from_str(&json).context("Bookmark data must be valid JSON")?;
            handle.store(data)?;
            println!("url: {}", navigator.current_url());
            Ok(())
        }
        ShellCommand::Url => {
            println!("url: {}", navigator.current_url());
            Ok(())
        }
        ShellCommand::Tree => {
            print!("{}", render_tree(&navigator.snapshot()?));
            Ok(())
        }
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    }
}

fn report(navigator: &Navigator, outcome: Outcome) -> Result<()> {
    if !outcome.has_changed {
        println!("unchanged");
    }
    println!("state: {}", active_states(navigator)?);
    println!("url: {}", navigator.current_url());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("  go /book/ch2 ").unwrap(),
            Some(ShellCommand::Go("/book/ch2".into()))
        );
        assert_eq!(
            ShellCommand::parse("store chapter {\"page\": 3}").unwrap(),
            Some(ShellCommand::Store {
                router: "chapter".into(),
                json: "{\"page\": 3}".into()
            })
        );
        assert_eq!(ShellCommand::parse("").unwrap(), None);
        assert_eq!(ShellCommand::parse("exit").unwrap(), Some(ShellCommand::Quit));
        assert!(ShellCommand::parse("go").is_err());
        assert!(ShellCommand::parse("jump /a").is_err());
    }
}
