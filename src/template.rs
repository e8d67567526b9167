//! `_NAME` token substitution in script templates.

use crate::validation::Environment;
use regex::{Captures, Regex, RegexBuilder};

/// Compiled size limit for the combined token pattern.
const TOKEN_PATTERN_LIMIT: usize = 10 * (1 << 20);

/// Replace `_name` tokens for every name in `env` in a single pass.
///
/// Longer names are tried first, so `_NAMESPACE` is never split by `NAME`.
/// Substituted values are not scanned again. Fails only when the combined
/// token pattern exceeds the regex size limit.
pub fn render(body: &str, env: &Environment) -> Result<String, regex::Error> {
    render_within(body, env, TOKEN_PATTERN_LIMIT)
}

fn render_within(body: &str, env: &Environment, limit: usize) -> Result<String, regex::Error> {
    if env.is_empty() {
        return Ok(body.to_string());
    }
    let tokens = token_regex(env, limit).inspect_err(|err| {
        tracing::warn!(error = %err, tokens = env.len(), "failed to build token pattern");
    })?;

    let rendered = tokens.replace_all(body, |caps: &Captures<'_>| {
        env.get(&caps[1]).unwrap_or(&caps[0]).to_string()
    });

    tracing::debug!(tokens = env.len(), "script rendered");
    Ok(rendered.into_owned())
}

fn token_regex(env: &Environment, limit: usize) -> Result<Regex, regex::Error> {
    let mut names: Vec<&str> = env.iter().map(|(name, _)| name).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!("_({alternation})"))
        .size_limit(limit)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let out = render("listen _PORT\n# port=_PORT", &env(&[("PORT", "8080")])).unwrap();
        assert_eq!(out, "listen 8080\n# port=8080");
    }

    #[test]
    fn leaves_unknown_tokens_alone() {
        let out = render("_HOST:_PORT", &env(&[("PORT", "22")])).unwrap();
        assert_eq!(out, "_HOST:22");
    }

    #[test]
    fn longest_name_wins() {
        let vars = env(&[("NAME", "web"), ("NAMESPACE", "prod")]);
        assert_eq!(render("_NAMESPACE/_NAME", &vars).unwrap(), "prod/web");

        let reversed = env(&[("NAMESPACE", "prod"), ("NAME", "web")]);
        assert_eq!(render("_NAMESPACE/_NAME", &reversed).unwrap(), "prod/web");
    }

    #[test]
    fn values_are_not_rescanned() {
        let vars = env(&[("A", "_B"), ("B", "_A")]);
        assert_eq!(render("_A _B", &vars).unwrap(), "_B _A");
    }

    #[test]
    fn values_with_regex_syntax_are_literal() {
        let vars = env(&[("X.Y", "$1"), ("DIR", r"C:\temp")]);
        assert_eq!(render("_X.Y _XzY _DIR", &vars).unwrap(), r"$1 _XzY C:\temp");
    }

    #[test]
    fn empty_environment_is_identity() {
        let body = "echo _PORT";
        assert_eq!(render(body, &Environment::default()).unwrap(), body);
    }

    #[test]
    fn oversized_token_pattern_is_an_error() {
        let vars = env(&[("PORT", "22"), ("NAMESPACE", "prod")]);
        assert!(render_within("echo _PORT", &vars, 1).is_err());
        assert_eq!(render_within("echo _PORT", &vars, TOKEN_PATTERN_LIMIT).unwrap(), "echo 22");
    }
}
