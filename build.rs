use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding the crate's own Rust sources.
const SOURCE_DIRS: [&str; 5] = ["analysis", "report", "cli", "tests", "benches"];

const REVISION_MARKERS: &str =
    "FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE";

// Source policies enforced on every build. Each rule pairs a line regex with
// a finer check applied to the matched line.
#[derive(Clone, Copy)]
enum Rule {
    UnderscoreBinding,
    RevisionMarker,
    DoubleStar,
    ShoutedComment,
    AllowDeadCode,
}

impl Rule {
    const ALL: [Rule; 5] = [
        Rule::UnderscoreBinding,
        Rule::RevisionMarker,
        Rule::DoubleStar,
        Rule::ShoutedComment,
        Rule::AllowDeadCode,
    ];

    fn pattern(self) -> String {
        match self {
            Rule::UnderscoreBinding => r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            Rule::RevisionMarker => format!(r"(//|/\*).*(?:{REVISION_MARKERS})"),
            Rule::DoubleStar => r"(//|/\*).*\*\*".to_string(),
            Rule::ShoutedComment => r"(//|/\*).*".to_string(),
            Rule::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
        }
    }

    fn advice(self) -> &'static str {
        match self {
            Rule::UnderscoreBinding => {
                "Underscore-prefixed names are not allowed. Use the binding or remove it."
            }
            Rule::RevisionMarker => {
                "Comments must describe the code, not its history. Remove revision markers such as 'FIXED' or 'UPDATE'."
            }
            Rule::DoubleStar => "The '**' pattern is only allowed in doc comments.",
            Rule::ShoutedComment => {
                "Comments whose letters are all uppercase are not allowed. Consider deleting the comment."
            }
            Rule::AllowDeadCode => "#[allow(dead_code)] is not allowed. Use the code or remove it.",
        }
    }

    // Whether a line matched by `pattern` is a real violation.
    fn flags(self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match self {
            Rule::UnderscoreBinding => !is_comment(trimmed) && !underscore_only_in_strings(line),
            Rule::RevisionMarker | Rule::AllowDeadCode => true,
            Rule::DoubleStar => !trimmed.starts_with("///") && !trimmed.starts_with("//!"),
            Rule::ShoutedComment => comment_text(trimmed).is_some_and(|text| {
                let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
            }),
        }
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*")
}

// True when every underscore on the line sits inside a string literal.
fn underscore_only_in_strings(line: &str) -> bool {
    line.split('"')
        .enumerate()
        .all(|(i, part)| i % 2 == 1 || !part.contains('_'))
}

fn comment_text(trimmed: &str) -> Option<&str> {
    ["///", "//!", "//"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .map(str::trim)
}

struct LineCollector {
    rule: Rule,
    violations: Vec<String>,
}

impl Sink for LineCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.rule.flags(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn rust_sources() -> Vec<PathBuf> {
    SOURCE_DIRS
        .iter()
        .filter(|dir| Path::new(dir).is_dir())
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn scan(sources: &[PathBuf]) -> Result<Vec<String>, Box<dyn Error>> {
    let mut searcher = Searcher::new();
    let mut reports = Vec::new();

    for rule in Rule::ALL {
        let matcher = RegexMatcher::new_line_matcher(&rule.pattern())?;
        for path in sources {
            let mut collector = LineCollector {
                rule,
                violations: Vec::new(),
            };
            searcher.search_path(&matcher, path, &mut collector)?;
            if collector.violations.is_empty() {
                continue;
            }

            let mut message = format!(
                "\n❌ ERROR: {} policy violation(s) in {}:\n",
                collector.violations.len(),
                path.display()
            );
            for violation in &collector.violations {
                message.push_str(&format!("   {violation}\n"));
            }
            message.push_str(&format!("⚠️ {}\n", rule.advice()));
            reports.push(message);
        }
    }
    Ok(reports)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    match scan(&rust_sources()) {
        Ok(reports) if reports.is_empty() => {}
        Ok(reports) => {
            for report in reports {
                eprintln!("{report}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Source policy scan failed: {e}");
            std::process::exit(1);
        }
    }
}
