//! # Subjects and Options Subcommands

use anyhow::Result;
use clap::Args;

use enroll_client::OptionEntry;

use crate::{flush_notices, Context};

/// Arguments for `enroll subjects`.
#[derive(Args, Debug)]
pub struct SubjectsArgs {}

/// Arguments for `enroll options`.
#[derive(Args, Debug)]
pub struct OptionsArgs {
    /// Show Arabic labels instead of English ones.
    #[arg(long)]
    pub arabic: bool,
}

pub async fn run_subjects(_args: &SubjectsArgs, ctx: &Context) -> Result<u8> {
    let mut session = ctx.session();
    let subjects = session.load_catalog().await;
    if subjects.is_empty() {
        println!("no subjects available");
    }
    for subject in subjects {
        println!("{}  {:<24} {:<10} {}", subject.icon, subject.name, subject.id.as_str(), subject.color);
    }
    flush_notices(&mut session);
    Ok(0)
}

pub async fn run_options(args: &OptionsArgs, ctx: &Context) -> Result<u8> {
    let mut session = ctx.session();
    let options = session.load_options().await.clone();
    flush_notices(&mut session);

    for (title, entries) in [
        ("Group types", &options.group_types),
        ("Group levels", &options.group_levels),
        ("Education types", &options.education_types),
        ("Grades", &options.grades),
    ] {
        println!("{title}:");
        for line in option_lines(entries, args.arabic) {
            println!("  {line}");
        }
    }
    Ok(0)
}

fn option_lines(entries: &[OptionEntry], arabic: bool) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let label = if arabic && !e.label_ar.is_empty() {
                e.label_ar.as_str()
            } else {
                e.label()
            };
            format!("{:<16} {label}", e.value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str, en: &str, ar: &str) -> OptionEntry {
        serde_json::from_value(serde_json::json!({
            "value": value, "labelEn": en, "labelAr": ar
        }))
        .unwrap()
    }

    #[test]
    fn option_lines_prefer_requested_language() {
        let entries = [entry("azhar", "Azhar", "أزهري"), entry("KG1", "", "")];
        let en = option_lines(&entries, false);
        assert!(en[0].ends_with("Azhar"));
        assert!(en[1].ends_with("KG1"));

        let ar = option_lines(&entries, true);
        assert!(ar[0].ends_with("أزهري"));
        assert!(ar[1].ends_with("KG1"));
    }
}
