//! Go build constraints
//!
//! A file takes part in a build only if its name suffixes (`_linux.go`,
//! `_windows_amd64.go`) and its header constraint (`//go:build` or the
//! legacy `// +build` lines) are satisfied by the target platform.

use anyhow::{bail, Context};

/// Operating systems recognized in file name suffixes
pub const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Architectures recognized in file name suffixes
pub const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target platform and extra tags files are selected for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    /// Tags passed with `-tags`
    pub tags: Vec<String>,
    pub cgo: bool,
}

impl BuildContext {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            tags: Vec::new(),
            cgo: true,
        }
    }

    /// The platform this process runs on, in Go's naming
    pub fn host() -> Self {
        Self::new(host_goos(), host_goarch())
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether a single build tag is satisfied
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch {
            return true;
        }
        match tag {
            "linux" => self.goos == "android",
            "solaris" => self.goos == "illumos",
            "darwin" => self.goos == "ios",
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "gc" => true,
            "cgo" => self.cgo,
            _ if is_release_tag(tag) => true,
            _ => self.tags.iter().any(|t| t == tag),
        }
    }

    /// Whether the `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix of a file
    /// name, if any, matches
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = file_name.split('.').next().unwrap_or(file_name);
        let Some(underscore) = stem.find('_') else {
            return true;
        };

        // Everything before the first underscore is never a suffix
        let mut parts: Vec<&str> = stem[underscore..].split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        match parts.as_slice() {
            [.., os, arch] if KNOWN_OS.contains(os) && KNOWN_ARCH.contains(arch) => {
                self.matches_tag(os) && self.matches_tag(arch)
            }
            [.., last] if KNOWN_OS.contains(last) || KNOWN_ARCH.contains(last) => {
                self.matches_tag(last)
            }
            _ => true,
        }
    }

    /// Evaluate the constraint in a file's header
    ///
    /// Only comments before the package clause count. A `//go:build` line
    /// takes precedence over `// +build` lines; without either the file is
    /// always included.
    pub fn matches_source(&self, source: &str) -> anyhow::Result<bool> {
        let mut plus_build = Vec::new();
        for line in source.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            let Some(comment) = line.strip_prefix("//") else {
                break;
            };
            if let Some(expr) = directive(comment, "go:build") {
                return self
                    .eval(expr)
                    .with_context(|| format!("invalid //go:build expression {expr:?}"));
            }
            if let Some(options) = directive(comment.trim_start(), "+build") {
                plus_build.push(options);
            }
        }
        Ok(plus_build.iter().all(|line| self.eval_plus_build(line)))
    }

    /// Evaluate a `//go:build` expression
    pub fn eval(&self, expr: &str) -> anyhow::Result<bool> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser {
            ctx: self,
            tokens,
            pos: 0,
        };
        let value = parser.or()?;
        if parser.pos != parser.tokens.len() {
            bail!("unexpected {:?}", parser.tokens[parser.pos]);
        }
        Ok(value)
    }

    /// `// +build` line: space-separated options (OR) of comma-separated
    /// terms (AND)
    fn eval_plus_build(&self, line: &str) -> bool {
        line.split_whitespace().any(|option| {
            option.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !self.matches_tag(tag),
                None => self.matches_tag(term),
            })
        })
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::host()
    }
}

fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    let little = cfg!(target_endian = "little");
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if little => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if little => "mipsle",
        "mips64" if little => "mips64le",
        "wasm32" => "wasm",
        other => other,
    }
}

/// `go1.N` release tags; every release is assumed satisfied
fn is_release_tag(tag: &str) -> bool {
    tag.strip_prefix("go1.")
        .is_some_and(|minor| !minor.is_empty() && minor.chars().all(|c| c.is_ascii_digit()))
}

/// Text after `name` when `comment` is that directive followed by
/// whitespace or nothing
fn directive<'s>(comment: &'s str, name: &str) -> Option<&'s str> {
    let rest = comment.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'s> {
    Or,
    And,
    Not,
    Open,
    Close,
    Tag(&'s str),
}

fn tokenize(expr: &str) -> anyhow::Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();
    while let Some(c) = rest.chars().next() {
        let (token, len) = match c {
            '!' => (Token::Not, 1),
            '(' => (Token::Open, 1),
            ')' => (Token::Close, 1),
            '|' if rest.starts_with("||") => (Token::Or, 2),
            '&' if rest.starts_with("&&") => (Token::And, 2),
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .unwrap_or(rest.len());
                (Token::Tag(&rest[..len]), len)
            }
            other => bail!("unexpected character {other:?}"),
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }
    if tokens.is_empty() {
        bail!("empty expression");
    }
    Ok(tokens)
}

struct ExprParser<'c, 's> {
    ctx: &'c BuildContext,
    tokens: Vec<Token<'s>>,
    pos: usize,
}

impl ExprParser<'_, '_> {
    fn eat(&mut self, token: Token<'_>) -> bool {
        if self.tokens.get(self.pos) == Some(&token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> anyhow::Result<bool> {
        let mut value = self.and()?;
        while self.eat(Token::Or) {
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> anyhow::Result<bool> {
        let mut value = self.not()?;
        while self.eat(Token::And) {
            let rhs = self.not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn not(&mut self) -> anyhow::Result<bool> {
        if self.eat(Token::Not) {
            return Ok(!self.not()?);
        }
        if self.eat(Token::Open) {
            let value = self.or()?;
            if !self.eat(Token::Close) {
                bail!("missing )");
            }
            return Ok(value);
        }
        match self.tokens.get(self.pos) {
            Some(&Token::Tag(tag)) => {
                self.pos += 1;
                Ok(self.ctx.matches_tag(tag))
            }
            Some(other) => bail!("unexpected {other:?}"),
            None => bail!("unexpected end of expression"),
        }
    }
}
