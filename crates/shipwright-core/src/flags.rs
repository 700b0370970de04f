//! Linker flag composition.
//!
//! Flags are composed once per run from the project identity, a
//! [`BuildStamp`] and the configured template, then handed unchanged to every
//! build job of that run.

use std::process::Command;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::domain::{CoreError, ProjectIdentity, Result};

/// Environment variable pinning the build date for reproducible builds.
pub const SOURCE_DATE_EPOCH_ENV: &str = "SOURCE_DATE_EPOCH";

/// Host and user recorded in reproducible builds.
pub const REPRODUCIBLE: &str = "reproducible";

/// Target operating systems that cannot link statically.
pub const STATIC_EXCLUDED_OS: &[&str] = &["darwin", "solaris", "illumos"];

const STATIC_FLAG: &str = "-static";
const DEFAULT_DATE_FORMAT: &str = "%Y%m%d-%H:%M:%S";

/// When, where and by whom a build ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    pub date: DateTime<Utc>,
    pub host: String,
    pub user: String,
    pub reproducible: bool,
}

impl BuildStamp {
    /// Capture the stamp for this run, honouring `SOURCE_DATE_EPOCH`.
    pub fn capture() -> Self {
        let epoch = std::env::var(SOURCE_DATE_EPOCH_ENV).ok();
        if let Some(stamp) = Self::from_source_date_epoch(epoch.as_deref()) {
            return stamp;
        }
        Self {
            date: Utc::now(),
            host: hostname(),
            user: current_user(),
            reproducible: false,
        }
    }

    /// Reproducible stamp for an epoch value, if it parses as whole seconds.
    pub fn from_source_date_epoch(value: Option<&str>) -> Option<Self> {
        let secs: i64 = value?.trim().parse().ok()?;
        let date = DateTime::<Utc>::from_timestamp(secs, 0)?;
        Some(Self {
            date,
            host: REPRODUCIBLE.to_string(),
            user: REPRODUCIBLE.to_string(),
            reproducible: true,
        })
    }

    pub fn fixed(date: DateTime<Utc>, host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            date,
            host: host.into(),
            user: user.into(),
            reproducible: false,
        }
    }
}

fn command_output(program: &str) -> Option<String> {
    let output = Command::new(program).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn hostname() -> String {
    command_output("hostname")
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Login name of the invoking user.
pub(crate) fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
        .or_else(|| command_output("whoami"))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Everything a template may refer to.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub identity: &'a ProjectIdentity,
    pub stamp: &'a BuildStamp,
    pub repo_path: &'a str,
}

/// Render an ldflags template.
///
/// Supports `{{.Field}}` for identity fields and the functions `date`
/// (optionally with a quoted Go layout), `host`, `user` and `repoPath`.
pub fn render_template(template: &str, ctx: &TemplateContext<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| CoreError::template("unclosed action"))?;
        out.push_str(&eval_action(after[..end].trim(), ctx)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn eval_action(action: &str, ctx: &TemplateContext<'_>) -> Result<String> {
    if let Some(field) = action.strip_prefix('.') {
        return ctx
            .identity
            .field(field)
            .map(str::to_string)
            .ok_or_else(|| CoreError::template(format!("unknown field .{field}")));
    }

    let (name, arg) = match action.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim())),
        None => (action, None),
    };
    match (name, arg) {
        ("date", None) => Ok(ctx.stamp.date.format(DEFAULT_DATE_FORMAT).to_string()),
        ("date", Some(arg)) => {
            let layout = string_literal(arg)?;
            Ok(ctx.stamp.date.format(&go_layout_to_strftime(layout)).to_string())
        }
        ("host", None) => Ok(ctx.stamp.host.clone()),
        ("user", None) => Ok(ctx.stamp.user.clone()),
        ("repoPath", None) => Ok(ctx.repo_path.to_string()),
        ("host" | "user" | "repoPath", Some(_)) => Err(CoreError::template(format!(
            "{name} takes no arguments"
        ))),
        ("", _) => Err(CoreError::template("empty action")),
        _ => Err(CoreError::template(format!("function \"{name}\" not defined"))),
    }
}

fn string_literal(arg: &str) -> Result<&str> {
    for quote in ['"', '`'] {
        if let Some(body) = arg.strip_prefix(quote) {
            return body
                .strip_suffix(quote)
                .ok_or_else(|| CoreError::template(format!("unterminated string {arg}")));
        }
    }
    Err(CoreError::template(format!("expected a string, got {arg}")))
}

/// Translate a Go reference-time layout into a chrono format string.
fn go_layout_to_strftime(layout: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("2006", "%Y"),
        ("Jan", "%b"),
        ("Mon", "%a"),
        ("MST", "%Z"),
        ("01", "%m"),
        ("02", "%d"),
        ("15", "%H"),
        ("04", "%M"),
        ("05", "%S"),
        ("06", "%y"),
    ];

    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while !rest.is_empty() {
        for (token, directive) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(directive);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

/// Split a flag string on spaces, keeping single-quoted groups together.
///
/// `-a -tags 'netgo osusergo'` yields `["-a", "-tags", "netgo osusergo"]`.
pub fn split_parameters(s: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' => {
                chars.next();
            }
            '\'' => {
                chars.next();
                params.push(chars.by_ref().take_while(|&c| c != '\'').collect());
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ' ' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                params.push(word);
            }
        }
    }
    params
}

/// Composes the linker flags for one run.
#[derive(Debug, Clone)]
pub struct FlagComposer {
    identity: ProjectIdentity,
    stamp: BuildStamp,
    template: String,
    repo_path: String,
    static_link: bool,
    ext_ldflags: Vec<String>,
}

impl FlagComposer {
    pub fn new(identity: ProjectIdentity, stamp: BuildStamp) -> Self {
        Self {
            identity,
            stamp,
            template: String::new(),
            repo_path: String::new(),
            static_link: true,
            ext_ldflags: Vec::new(),
        }
    }

    pub fn from_config(config: &Config, identity: ProjectIdentity, stamp: BuildStamp) -> Self {
        Self::new(identity, stamp)
            .with_template(config.build.ldflags.clone())
            .with_repo_path(config.repository.path.clone())
            .with_static_link(config.build.static_link)
            .with_ext_ldflags(config.build.ext_ldflags.clone())
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_repo_path(mut self, repo_path: impl Into<String>) -> Self {
        self.repo_path = repo_path.into();
        self
    }

    pub fn with_static_link(mut self, static_link: bool) -> Self {
        self.static_link = static_link;
        self
    }

    pub fn with_ext_ldflags(mut self, ext_ldflags: Vec<String>) -> Self {
        self.ext_ldflags = ext_ldflags;
        self
    }

    pub fn stamp(&self) -> &BuildStamp {
        &self.stamp
    }

    /// Compose the flattened ldflags string for binaries targeting `target_os`.
    pub fn compose(&self, target_os: &str) -> Result<String> {
        let mut ldflags = Vec::new();

        if self.template.trim().is_empty() {
            ldflags.push(format!("-X main.Version={}", self.identity.version));
        } else {
            let ctx = TemplateContext {
                identity: &self.identity,
                stamp: &self.stamp,
                repo_path: &self.repo_path,
            };
            let rendered = render_template(&self.template, &ctx)?;
            ldflags.extend(
                rendered
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }

        let mut ext = self.ext_ldflags.clone();
        if self.static_link
            && !STATIC_EXCLUDED_OS.contains(&target_os)
            && !ext.iter().any(|f| f == STATIC_FLAG)
        {
            ext.push(STATIC_FLAG.to_string());
        }
        if !ext.is_empty() {
            ldflags.push(format!("-extldflags '{}'", ext.join(" ")));
        }

        Ok(ldflags.join(" "))
    }
}
