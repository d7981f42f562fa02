//! Per-language source line counter.
//!
//! Walks a directory tree (or a single file), classifies every line of each
//! recognized source file as code, comment, or blank, and prints per-language
//! totals. Classification is a single pass over the raw bytes of a file,
//! driven by the language's comment markers; it never needs the content to be
//! valid UTF-8.
//!
//! Supported languages: C, C++, C/C++ headers, Rust, Go, Java, C#,
//! JavaScript, TypeScript, Python, Shell, Ruby, Perl, Pascal, CSS, SQL,
//! TOML, YAML.

use clap::{ArgAction, Parser};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use colored::*;
use glob::Pattern;

// Fixed widths for the totals table.
const LANG_WIDTH: usize = 12;
const COUNT_WIDTH: usize = 10;

// Directory names that are never descended into. `--ignore` extends this
// list at runtime.
const SKIP_DIRS: &[&str] = &["target", "build"];

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Counts code, comment, and blank lines per language",
    long_about = "Classifies every line under a directory tree (or in a single file) as code, \
comment, or blank and reports totals per language. Supported languages: C, C++, C/C++ headers, \
Rust, Go, Java, C#, JavaScript, TypeScript, Python, Shell, Ruby, Perl, Pascal, CSS, SQL, TOML, YAML."
)]
struct Args {
    #[arg(default_value = ".")]
    path: String,

    #[arg(short, long, action = ArgAction::Append)]
    ignore: Vec<String>,

    #[arg(short = 'f', long)]
    filespec: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

/// Comment syntax and file extensions for one recognized language.
///
/// A language either supports block comments or it does not: the open and
/// close markers travel together. Markers are matched as literal byte
/// strings, never as single-character heuristics.
#[derive(Debug, Clone, Copy)]
struct Language {
    name: &'static str,
    extensions: &'static [&'static str],
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
}

// Registration order is significant: the first language that claims an
// extension wins the lookup.
static LANGUAGES: &[Language] = &[
    Language {
        name: "C",
        extensions: &["c"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "C++",
        extensions: &["cpp", "cc", "cxx"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "Header",
        extensions: &["h", "hpp"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "Rust",
        extensions: &["rs"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "Go",
        extensions: &["go"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "Java",
        extensions: &["java"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "C#",
        extensions: &["cs"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "JavaScript",
        extensions: &["js", "jsx"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "TypeScript",
        extensions: &["ts", "tsx"],
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "Python",
        extensions: &["py"],
        line_comment: Some("#"),
        block_comment: None,
    },
    Language {
        name: "Shell",
        extensions: &["sh"],
        line_comment: Some("#"),
        block_comment: None,
    },
    Language {
        name: "Ruby",
        extensions: &["rb"],
        line_comment: Some("#"),
        block_comment: None,
    },
    Language {
        name: "Perl",
        extensions: &["pl", "pm"],
        line_comment: Some("#"),
        block_comment: None,
    },
    Language {
        name: "Pascal",
        extensions: &["pas"],
        line_comment: Some("//"),
        block_comment: Some(("{", "}")),
    },
    Language {
        name: "CSS",
        extensions: &["css"],
        line_comment: None,
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "SQL",
        extensions: &["sql"],
        line_comment: Some("--"),
        block_comment: Some(("/*", "*/")),
    },
    Language {
        name: "TOML",
        extensions: &["toml"],
        line_comment: Some("#"),
        block_comment: None,
    },
    Language {
        name: "YAML",
        extensions: &["yaml", "yml"],
        line_comment: Some("#"),
        block_comment: None,
    },
];

/// Line classification of one file: `total == code + comment + blank`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FileCounts {
    total: u64,
    code: u64,
    comment: u64,
    blank: u64,
}

impl FileCounts {
    fn merge(&mut self, other: FileCounts) {
        self.total += other.total;
        self.code += other.code;
        self.comment += other.comment;
        self.blank += other.blank;
    }

    /// Attribute the line described by `line` to exactly one bucket. Blank
    /// wins only when nothing else was seen on the line; code anywhere on
    /// the line wins over comment.
    fn finish_line(&mut self, line: LineState) {
        if line.blank {
            self.blank += 1;
        } else if line.code {
            self.code += 1;
        } else if line.comment {
            self.comment += 1;
        }
        self.total += 1;
    }
}

/// Classification flags for the physical line currently being scanned.
#[derive(Debug, Clone, Copy)]
struct LineState {
    blank: bool,
    code: bool,
    comment: bool,
}

impl LineState {
    fn fresh() -> Self {
        LineState {
            blank: true,
            code: false,
            comment: false,
        }
    }

    /// State for lines inside an open block comment.
    fn in_comment() -> Self {
        LineState {
            blank: false,
            code: false,
            comment: true,
        }
    }
}

/// Which comment construct, if any, begins at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentToken {
    Line,
    BlockOpen,
}

/// Tests the literal marker strings against `rest`. When both markers match
/// at the same position, the longer one wins.
fn comment_token_at(
    rest: &[u8],
    line_marker: Option<&[u8]>,
    block_open: Option<&[u8]>,
) -> Option<CommentToken> {
    let line_hit = line_marker.filter(|marker| rest.starts_with(marker));
    let block_hit = block_open.filter(|marker| rest.starts_with(marker));
    match (line_hit, block_hit) {
        (Some(line), Some(block)) if block.len() > line.len() => Some(CommentToken::BlockOpen),
        (Some(_), _) => Some(CommentToken::Line),
        (None, Some(_)) => Some(CommentToken::BlockOpen),
        (None, None) => None,
    }
}

/// Classify every line of `content` according to `language`'s comment
/// markers.
///
/// This is a single pass over the raw bytes; it accepts any content,
/// including binary data, and never fails. A final line lacking a trailing
/// newline still counts.
///
/// Block comments follow the conventions of the classic counters: the
/// opening line is finalized under the normal rules (code before the marker
/// keeps it a code line), every interior line counts as comment, and the
/// closing line resumes normal accounting after the close marker, so content
/// behind the close can still make it a code line. A close marker on the
/// opening line itself is part of that line's comment and does not terminate
/// the block.
fn classify_bytes(content: &[u8], language: &Language) -> FileCounts {
    let line_marker = language.line_comment.map(str::as_bytes);
    let block_open = language.block_comment.map(|(open, _)| open.as_bytes());
    let block_close = language.block_comment.map(|(_, close)| close.as_bytes());

    let mut counts = FileCounts::default();
    let mut line = LineState::fresh();
    let mut pos = 0;

    while pos < content.len() {
        let byte = content[pos];
        if byte == b'\n' {
            counts.finish_line(line);
            line = LineState::fresh();
            pos += 1;
            continue;
        }

        match comment_token_at(&content[pos..], line_marker, block_open) {
            Some(CommentToken::Line) => {
                line.comment = true;
                line.blank = false;
                // Everything up to the newline belongs to the comment.
                while pos < content.len() && content[pos] != b'\n' {
                    pos += 1;
                }
            }
            Some(CommentToken::BlockOpen) => {
                line.comment = true;
                line.blank = false;
                while pos < content.len() && content[pos] != b'\n' {
                    pos += 1;
                }
                if pos == content.len() {
                    // The opening line is also the unterminated final line;
                    // the end-of-input accounting below closes it out.
                    break;
                }
                counts.finish_line(line);
                pos += 1;
                line = LineState::in_comment();
                if let Some(close) = block_close {
                    // Interior lines count as comment until the close marker
                    // shows up; the close line itself goes back through
                    // ordinary end-of-line accounting.
                    while pos < content.len() {
                        if content[pos] == b'\n' {
                            counts.comment += 1;
                            counts.total += 1;
                            pos += 1;
                        } else if content[pos..].starts_with(close) {
                            pos += close.len();
                            break;
                        } else {
                            pos += 1;
                        }
                    }
                }
            }
            None => {
                if byte != b' ' && byte != b'\t' {
                    line.blank = false;
                    line.code = true;
                }
                pos += 1;
            }
        }
    }

    // A trailing line without a terminating newline still counts as a line.
    if !content.is_empty() && content[content.len() - 1] != b'\n' {
        counts.finish_line(line);
    }

    counts
}

/// Extension of `name`: the suffix after the last `.`. The leading byte of
/// the name never starts an extension, so dotfiles like `.bashrc` have none.
fn file_extension(name: &str) -> Option<&str> {
    let dot = name.bytes().rposition(|b| b == b'.').filter(|&i| i > 0)?;
    let ext = &name[dot + 1..];
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Ordered language table plus the extension lookup built from it.
struct LanguageRegistry {
    languages: &'static [Language],
    by_extension: HashMap<&'static str, usize>,
}

impl LanguageRegistry {
    fn new() -> Self {
        LanguageRegistry::with_languages(LANGUAGES)
    }

    fn with_languages(languages: &'static [Language]) -> Self {
        let mut by_extension = HashMap::new();
        for (index, language) in languages.iter().enumerate() {
            for ext in language.extensions {
                // First registration of an extension wins.
                by_extension.entry(*ext).or_insert(index);
            }
        }
        LanguageRegistry {
            languages,
            by_extension,
        }
    }

    /// Lookup is case-sensitive and performs no normalization: `foo.RS` is
    /// not Rust.
    fn resolve_language(&self, file_name: &str) -> Option<usize> {
        let ext = file_extension(file_name)?;
        self.by_extension.get(ext).copied()
    }

    fn language(&self, index: usize) -> &Language {
        &self.languages[index]
    }

    fn len(&self) -> usize {
        self.languages.len()
    }
}

/// Running totals for one language, accumulated across every scanned file.
#[derive(Debug, Default, Clone, Copy)]
struct LanguageTotals {
    lines: FileCounts,
    files: u64,
    bytes: u64,
}

/// Per-language accumulator for one run, indexed parallel to the registry.
struct ScanTotals {
    per_language: Vec<LanguageTotals>,
}

impl ScanTotals {
    fn new(registry: &LanguageRegistry) -> Self {
        ScanTotals {
            per_language: vec![LanguageTotals::default(); registry.len()],
        }
    }

    fn record(&mut self, index: usize, counts: FileCounts, bytes: u64) {
        let totals = &mut self.per_language[index];
        totals.lines.merge(counts);
        totals.files += 1;
        totals.bytes += bytes;
    }
}

fn should_process_file(filespec: Option<&Pattern>, root_path: &Path, file_path: &Path) -> bool {
    filespec
        .map(|pattern| filespec_matches(pattern, root_path, file_path))
        .unwrap_or(true)
}

/// A filespec matches on the bare file name or on the path relative to the
/// scan root (with `/` separators).
fn filespec_matches(pattern: &Pattern, root_path: &Path, file_path: &Path) -> bool {
    if file_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| pattern.matches(name))
        .unwrap_or(false)
    {
        return true;
    }

    let relative = match file_path.strip_prefix(root_path) {
        Ok(rel) => rel,
        Err(_) => return false,
    };
    match relative.to_str() {
        Some(rel) => pattern.matches(&rel.replace('\\', "/")),
        None => false,
    }
}

fn is_skipped_dir(path: &Path, extra_ignore: &[String]) -> bool {
    let dir_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    SKIP_DIRS.contains(&dir_name) || extra_ignore.iter().any(|name| name == dir_name)
}

fn walk_error(path: &Path, what: &str, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("{what} {}: {err}", path.display()))
}

/// Immediate children of `dir`, split into regular files and
/// subdirectories. Hidden entries are dropped from both lists, and so are
/// subdirectories on the skip list. Symlinks and other special files are
/// ignored entirely. Any enumeration failure aborts the run.
fn list_directory(dir: &Path, extra_ignore: &[String]) -> io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    let entries = fs::read_dir(dir).map_err(|err| walk_error(dir, "cannot read directory", err))?;
    for entry_result in entries {
        let entry =
            entry_result.map_err(|err| walk_error(dir, "cannot read directory entry", err))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let file_type = entry
            .file_type()
            .map_err(|err| walk_error(&entry.path(), "cannot determine type of", err))?;
        if file_type.is_file() {
            files.push(entry.path());
        } else if file_type.is_dir() && !is_skipped_dir(&entry.path(), extra_ignore) {
            dirs.push(entry.path());
        }
    }

    Ok((files, dirs))
}

/// Classify one file and fold its counts into the accumulator. Files whose
/// extension matches no registered language are skipped without touching any
/// totals; a read failure on a selected file is fatal.
fn scan_file(
    file_path: &Path,
    root_path: &Path,
    args: &Args,
    registry: &LanguageRegistry,
    totals: &mut ScanTotals,
    filespec: Option<&Pattern>,
) -> io::Result<()> {
    if !should_process_file(filespec, root_path, file_path) {
        return Ok(());
    }

    let Some(index) = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| registry.resolve_language(name))
    else {
        return Ok(());
    };

    let content =
        fs::read(file_path).map_err(|err| walk_error(file_path, "cannot read file", err))?;
    let counts = classify_bytes(&content, registry.language(index));
    totals.record(index, counts, content.len() as u64);

    if args.verbose {
        println!("File: {}", file_path.display());
        println!("  Total lines: {}", counts.total);
        println!("  Code lines: {}", counts.code);
        println!("  Comment lines: {}", counts.comment);
        println!("  Blank lines: {}", counts.blank);
        println!();
    }

    Ok(())
}

/// Depth-first descent: all regular files of a directory are classified
/// before any of its subdirectories are entered.
fn scan_directory(
    dir: &Path,
    root_path: &Path,
    args: &Args,
    registry: &LanguageRegistry,
    totals: &mut ScanTotals,
    filespec: Option<&Pattern>,
) -> io::Result<()> {
    let (files, dirs) = list_directory(dir, &args.ignore)?;

    for file in &files {
        scan_file(file, root_path, args, registry, totals, filespec)?;
    }
    for sub_dir in &dirs {
        scan_directory(sub_dir, root_path, args, registry, totals, filespec)?;
    }

    Ok(())
}

/// Format the per-language totals table. Languages with no bytes scanned are
/// omitted; rows appear in registry order.
fn build_totals_report(registry: &LanguageRegistry, totals: &ScanTotals) -> String {
    let mut output = String::new();

    let header = format!(
        "{:<lang$} {:>count$} {:>count$} {:>count$} {:>count$}",
        "Language",
        "Total",
        "Code",
        "Comment",
        "Blank",
        lang = LANG_WIDTH,
        count = COUNT_WIDTH
    );
    let separator = "-".repeat(header.len());
    let _ = writeln!(output, "{}", header.bold());
    let _ = writeln!(output, "{}", separator);

    let mut grand_total = FileCounts::default();
    let mut any_scanned = false;
    for (language, lang_totals) in registry.languages.iter().zip(&totals.per_language) {
        if lang_totals.bytes == 0 {
            continue;
        }
        any_scanned = true;
        grand_total.merge(lang_totals.lines);
        let _ = writeln!(
            output,
            "{:<lang$} {:>count$} {:>count$} {:>count$} {:>count$}",
            language.name,
            lang_totals.lines.total,
            lang_totals.lines.code,
            lang_totals.lines.comment,
            lang_totals.lines.blank,
            lang = LANG_WIDTH,
            count = COUNT_WIDTH
        );
    }

    if any_scanned {
        let _ = writeln!(output, "{}", separator);
        let _ = writeln!(
            output,
            "{:<lang$} {:>count$} {:>count$} {:>count$} {:>count$}",
            "Total",
            grand_total.total,
            grand_total.code,
            grand_total.comment,
            grand_total.blank,
            lang = LANG_WIDTH,
            count = COUNT_WIDTH
        );
    }

    output
}

fn run(args: &Args) -> io::Result<()> {
    let filespec = match args.filespec.as_deref() {
        Some(spec) => Some(Pattern::new(spec).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid filespec pattern '{spec}': {err}"),
            )
        })?),
        None => None,
    };

    let registry = LanguageRegistry::new();
    let mut totals = ScanTotals::new(&registry);

    let root = PathBuf::from(&args.path);
    let metadata =
        fs::metadata(&root).map_err(|err| walk_error(&root, "cannot access path", err))?;

    if metadata.is_file() {
        scan_file(&root, &root, args, &registry, &mut totals, filespec.as_ref())?;
    } else if metadata.is_dir() {
        scan_directory(&root, &root, args, &registry, &mut totals, filespec.as_ref())?;
    } else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} is neither a regular file nor a directory",
                root.display()
            ),
        ));
    }

    print!("{}", build_totals_report(&registry, &totals));
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{} {err}", "ERROR:".red().bold());
        process::exit(1);
    }
}
