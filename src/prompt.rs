// Console input helpers.
use crate::filter::{Choice, Dimension};
use crate::util::{parse_date_safe, parse_f64_safe};
use chrono::NaiveDate;
use std::io::{self, Write};

/// Source of operator input, one line at a time.
pub trait Prompt {
    /// Print `label` and read one trimmed line. End of input reads as empty.
    fn line(&mut self, label: &str) -> String;

    /// True once the input source is exhausted.
    fn closed(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct StdinPrompt {
    eof: bool,
}

impl Prompt for StdinPrompt {
    fn line(&mut self, label: &str) -> String {
        print!("{}", label);
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => self.eof = true,
            Ok(_) => {}
        }
        buf.trim().to_string()
    }

    fn closed(&self) -> bool {
        self.eof
    }
}

/// Read "Enter choice: " the way every menu does.
pub fn read_choice(p: &mut dyn Prompt) -> String {
    p.line("Enter choice: ")
}

/// Offer `[0] Show All` plus the options. Blank or out of range keeps `current`.
pub fn choose(p: &mut dyn Prompt, dim: Dimension, options: &[String], current: &Choice) -> Choice {
    println!("{}:", dim.label());
    println!("  [0] Show All");
    for (i, o) in options.iter().enumerate() {
        let marker = if current.accepts(Some(o)) && *current != Choice::ShowAll { " *" } else { "" };
        println!("  [{}] {}{}", i + 1, o, marker);
    }
    match p.line("Select: ").parse::<usize>() {
        Ok(0) => Choice::ShowAll,
        Ok(n) if n <= options.len() => Choice::Only(options[n - 1].clone()),
        _ => current.clone(),
    }
}

/// Blank input keeps `default`. Unparseable input is reported and also keeps it.
pub fn read_date(p: &mut dyn Prompt, label: &str, default: NaiveDate) -> NaiveDate {
    let raw = p.line(&format!("{} [{}]: ", label, default.format("%Y-%m-%d")));
    if raw.is_empty() {
        return default;
    }
    parse_date_safe(Some(raw.as_str())).unwrap_or_else(|| {
        println!("Invalid date '{}', keeping {}.", raw, default.format("%Y-%m-%d"));
        default
    })
}

pub fn read_number(p: &mut dyn Prompt, label: &str) -> Option<f64> {
    parse_f64_safe(Some(p.line(label).as_str()))
}

pub fn confirm(p: &mut dyn Prompt, label: &str) -> bool {
    loop {
        match p.line(&format!("{} (Y/N): ", label)).to_uppercase().as_str() {
            "Y" => return true,
            "N" | "" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Replays fixed answers; runs dry as empty lines.
#[cfg(test)]
pub struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompt {
            answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn line(&mut self, _label: &str) -> String {
        self.answers.pop_front().unwrap_or_default()
    }
}
