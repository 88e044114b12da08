//! `RUST_LOG`-style level filtering for slog drains.

use slog::{Drain, Level, OwnedKVList, Record};
use std::{env, str::FromStr};

/// A single `module=level` directive. A directive without a module
/// part applies everywhere.
#[derive(Debug)]
struct Directive {
    prefix: Option<String>,
    level: Level,
}

impl Directive {
    /// Parse one comma-separated element of the filter string:
    /// `module=level` or a bare `level`.
    fn parse(directive: &str) -> Option<Self> {
        let mut parts = directive.splitn(2, '=');
        let first = parts.next()?;

        match parts.next() {
            None => Level::from_str(first).ok().map(|level| Self {
                prefix: None,
                level,
            }),
            Some(level) => {
                let valid_prefix = first
                    .chars()
                    .all(|c| matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | ':' | '_'));
                if !valid_prefix {
                    return None;
                }

                Level::from_str(level).ok().map(|level| Self {
                    prefix: Some(first.to_string()),
                    level,
                })
            }
        }
    }

    fn applies_to(&self, module: &str) -> bool {
        self.prefix
            .as_ref()
            .map_or(true, |prefix| module.starts_with(prefix.as_str()))
    }
}

/// Drain wrapper that drops records below the configured levels.
pub struct EnvFilter<D: Drain> {
    drain: D,
    directives: Vec<Directive>,
}

impl<D: Drain> EnvFilter<D> {
    /// Builds the filter from `RUST_LOG`, defaulting to `info`.
    pub fn from_env(drain: D) -> Self {
        let spec = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        Self::new(drain, &spec)
    }

    /// Invalid directives are ignored rather than reported.
    pub fn new(drain: D, spec: &str) -> Self {
        let directives = spec.split(',').filter_map(Directive::parse).collect();

        Self { drain, directives }
    }

    fn is_enabled(&self, module: &str, level: Level) -> bool {
        // The last matching directive wins.
        self.directives
            .iter()
            .filter(|directive| directive.applies_to(module))
            .last()
            .map(|directive| level <= directive.level)
            .unwrap_or(false)
    }
}

impl<D> Drain for EnvFilter<D>
where
    D: Drain<Ok = ()>,
{
    type Ok = ();
    type Err = D::Err;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<(), D::Err> {
        if !self.is_enabled(record.module(), record.level()) {
            return Ok(());
        }

        self.drain.log(record, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    #[test]
    fn bare_levels_apply_everywhere() {
        let filter = EnvFilter::new(Discard, "debug");

        assert!(filter.is_enabled("forkserv::server", Level::Debug));
        assert!(filter.is_enabled("forkserv::server", Level::Error));
        assert!(!filter.is_enabled("forkserv::server", Level::Trace));
    }

    #[test]
    fn module_directives_only_apply_to_their_prefix() {
        let filter = EnvFilter::new(Discard, "warning,forkserv::io=trace");

        assert!(filter.is_enabled("forkserv::io", Level::Trace));
        assert!(filter.is_enabled("other", Level::Warning));
        assert!(!filter.is_enabled("other", Level::Info));
    }

    #[test]
    fn invalid_directives_are_ignored() {
        let filter = EnvFilter::new(Discard, "nonsense,{bad}=debug,info");

        assert!(filter.is_enabled("anything", Level::Info));
        assert!(!filter.is_enabled("anything", Level::Debug));
    }
}
