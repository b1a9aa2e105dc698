//! Expression parsing and evaluation

use super::{ExpressionResolver, ResolverScope};
use crate::core::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Hard bound on nested and recursive expansion
pub const MAX_RESOLUTION_DEPTH: usize = 32;

/// Resolver evaluations allowed for one value
///
/// Caps the total work of chains that fan out without nesting deeper,
/// such as `a = ${b}${b}`, `b = ${c}${c}` and so on.
pub const MAX_RESOLUTION_STEPS: usize = 1024;

const OPEN: &str = "${";
const OPEN_BYTES: &[u8] = b"${";
const ESCAPED_OPEN_BYTES: &[u8] = b"\\${";

/// A parsed fragment of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied verbatim
    Literal(&'a str),
    /// `\${`, emitted as a literal `${`
    Escaped,
    /// The body of a `${...}` placeholder, possibly with nested placeholders
    Expression(&'a str),
}

/// Split a value into literal text and placeholders
///
/// An unterminated `${` and everything after it is literal.
pub fn parse(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(ESCAPED_OPEN_BYTES) {
            push_literal(&mut segments, &text[literal_start..i]);
            segments.push(Segment::Escaped);
            i += ESCAPED_OPEN_BYTES.len();
            literal_start = i;
        } else if bytes[i..].starts_with(OPEN_BYTES) {
            let body_start = i + OPEN_BYTES.len();
            let Some(close) = find_closing(bytes, body_start) else {
                break;
            };
            push_literal(&mut segments, &text[literal_start..i]);
            segments.push(Segment::Expression(&text[body_start..close]));
            i = close + 1;
            literal_start = i;
        } else {
            i += 1;
        }
    }

    push_literal(&mut segments, &text[literal_start..]);
    segments
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Index of the `}` closing a placeholder whose body starts at `from`
fn find_closing(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        if bytes[i..].starts_with(ESCAPED_OPEN_BYTES) {
            depth += 1;
            i += ESCAPED_OPEN_BYTES.len();
        } else if bytes[i..].starts_with(OPEN_BYTES) {
            depth += 1;
            i += OPEN_BYTES.len();
        } else {
            if bytes[i] == b'}' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            i += 1;
        }
    }
    None
}

/// Output of a resolution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The resolved text
    pub text: String,
    /// `false` if any placeholder was left unresolved
    pub complete: bool,
}

enum Attempt {
    Found(Rendered),
    Miss,
    Cycle,
    Exhausted,
}

struct State<'a> {
    scope: ResolverScope<'a>,
    mask_unresolved: bool,
    stack: Vec<String>,
    steps: usize,
    exhausted: bool,
}

/// Resolves placeholders against a fixed set of resolvers
///
/// Registering two resolvers with the same id keeps the later one.
#[derive(Clone, Default)]
pub struct ExpressionEvaluator {
    by_id: HashMap<String, Arc<dyn ExpressionResolver>>,
    chain: Vec<Arc<dyn ExpressionResolver>>,
}

impl ExpressionEvaluator {
    /// Register resolvers and fix the default chain order
    pub fn new(resolvers: impl IntoIterator<Item = Arc<dyn ExpressionResolver>>) -> Self {
        let mut by_id: HashMap<String, Arc<dyn ExpressionResolver>> = HashMap::new();
        for resolver in resolvers {
            let id = resolver.resolver_id().to_string();
            if by_id.insert(id, resolver).is_some() {
                tracing::debug!("Replaced expression resolver with a duplicate id");
            }
        }

        let mut chain: Vec<_> = by_id
            .values()
            .filter(|resolver| resolver.in_default_chain())
            .cloned()
            .collect();
        chain.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.resolver_id().cmp(b.resolver_id()))
        });

        Self { by_id, chain }
    }

    /// Check if no resolver is registered
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Ids of the default chain in the order they are tried
    pub fn chain_ids(&self) -> Vec<&str> {
        self.chain.iter().map(|r| r.resolver_id()).collect()
    }

    /// Resolve every placeholder in `value`
    ///
    /// Unresolved placeholders become `?{expression}` when `mask_unresolved`
    /// is set and disappear otherwise.
    pub fn resolve(&self, value: &str, mask_unresolved: bool, scope: &ResolverScope<'_>) -> String {
        self.render(value, mask_unresolved, scope, Vec::new()).text
    }

    /// Resolve the value of configuration key `key`
    ///
    /// The key is treated as in flight, so a value referring back to its own
    /// key is reported as a cycle.
    pub fn resolve_key(
        &self,
        key: &str,
        value: &str,
        mask_unresolved: bool,
        scope: &ResolverScope<'_>,
    ) -> String {
        self.render(value, mask_unresolved, scope, vec![format!("conf:{key}")])
            .text
    }

    /// Resolve `value` with `stack` as the in-flight identities
    pub fn render(
        &self,
        value: &str,
        mask_unresolved: bool,
        scope: &ResolverScope<'_>,
        stack: Vec<String>,
    ) -> Rendered {
        if !value.contains(OPEN) {
            return Rendered {
                text: value.to_string(),
                complete: true,
            };
        }
        let mut state = State {
            scope: *scope,
            mask_unresolved,
            stack,
            steps: 0,
            exhausted: false,
        };
        self.render_in(value, &mut state, 0)
    }

    fn render_in(&self, text: &str, state: &mut State<'_>, depth: usize) -> Rendered {
        let mut out = String::with_capacity(text.len());
        let mut complete = true;

        for segment in parse(text) {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Escaped => out.push_str(OPEN),
                Segment::Expression(body) => match self.expand(body, state, depth) {
                    Some(rendered) => {
                        complete &= rendered.complete;
                        out.push_str(&rendered.text);
                    }
                    None => {
                        complete = false;
                        if state.mask_unresolved {
                            out.push_str("?{");
                            out.push_str(body);
                            out.push('}');
                        }
                    }
                },
            }
        }

        Rendered {
            text: out,
            complete,
        }
    }

    fn expand(&self, body: &str, state: &mut State<'_>, depth: usize) -> Option<Rendered> {
        if state.exhausted {
            return None;
        }
        if depth >= MAX_RESOLUTION_DEPTH {
            let err = ConfigError::resolution(
                body,
                format!("nested deeper than {MAX_RESOLUTION_DEPTH} levels"),
            );
            tracing::warn!(action = "resolve", error = %err, "Giving up on expression");
            return None;
        }

        // Innermost placeholders first
        let expression = if body.contains(OPEN) {
            let inner = self.render_in(body, state, depth + 1);
            if !inner.complete {
                return None;
            }
            inner.text
        } else {
            body.to_string()
        };

        if let Some((id, rest)) = expression.split_once(':') {
            if let Some(resolver) = self.by_id.get(id) {
                return match self.attempt(resolver, rest, state, depth) {
                    Attempt::Found(rendered) => Some(rendered),
                    Attempt::Miss => {
                        tracing::warn!(
                            action = "resolve",
                            resolver = id,
                            expression = rest,
                            "Expression left unresolved"
                        );
                        None
                    }
                    Attempt::Cycle | Attempt::Exhausted => None,
                };
            }
        }

        for resolver in &self.chain {
            match self.attempt(resolver, &expression, state, depth) {
                Attempt::Found(rendered) => return Some(rendered),
                Attempt::Cycle | Attempt::Exhausted => return None,
                Attempt::Miss => {}
            }
        }

        tracing::warn!(action = "resolve", expression = %expression, "Expression left unresolved");
        None
    }

    fn attempt(
        &self,
        resolver: &Arc<dyn ExpressionResolver>,
        expression: &str,
        state: &mut State<'_>,
        depth: usize,
    ) -> Attempt {
        let identity = format!("{}:{expression}", resolver.resolver_id());
        if state.stack.contains(&identity) {
            let mut chain = state.stack.clone();
            chain.push(identity.clone());
            let err = ConfigError::cycle(identity, chain);
            tracing::warn!(action = "resolve", error = %err, "Cyclic expression left unresolved");
            return Attempt::Cycle;
        }

        if state.steps >= MAX_RESOLUTION_STEPS {
            if !state.exhausted {
                state.exhausted = true;
                let err = ConfigError::resolution(
                    expression,
                    format!("more than {MAX_RESOLUTION_STEPS} evaluations for one value"),
                );
                tracing::warn!(action = "resolve", error = %err, "Giving up on expression");
            }
            return Attempt::Exhausted;
        }
        state.steps += 1;

        let raw = match resolver.evaluate(expression, &state.scope) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Attempt::Miss,
            Err(e) => {
                tracing::warn!(
                    action = "resolve",
                    resolver = resolver.resolver_id(),
                    error = %e,
                    "Resolver failed, trying next"
                );
                return Attempt::Miss;
            }
        };
        tracing::trace!(resolver = resolver.resolver_id(), expression, "Expression evaluated");

        state.stack.push(identity);
        let rendered = self.render_in(&raw, state, depth + 1);
        state.stack.pop();
        Attempt::Found(rendered)
    }
}

impl std::fmt::Debug for ExpressionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.by_id.keys().collect();
        ids.sort();
        f.debug_struct("ExpressionEvaluator")
            .field("resolvers", &ids)
            .field("chain", &self.chain_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::{FnResolver, MapResolver};
    use pretty_assertions::assert_eq;

    fn evaluator(resolvers: Vec<Arc<dyn ExpressionResolver>>) -> ExpressionEvaluator {
        ExpressionEvaluator::new(resolvers)
    }

    fn map(id: &str, pairs: &[(&str, &str)]) -> Arc<dyn ExpressionResolver> {
        Arc::new(MapResolver::new(id, pairs.iter().copied()))
    }

    fn resolve(eval: &ExpressionEvaluator, value: &str) -> String {
        eval.resolve(value, true, &ResolverScope::empty())
    }

    #[test]
    fn parse_splits_segments() {
        assert_eq!(
            parse(r"a ${x} \${y} ${z"),
            vec![
                Segment::Literal("a "),
                Segment::Expression("x"),
                Segment::Literal(" "),
                Segment::Escaped,
                Segment::Literal("y} ${z"),
            ]
        );
        assert_eq!(
            parse("${m:${p:x}.url}!"),
            vec![Segment::Expression("m:${p:x}.url"), Segment::Literal("!")]
        );
    }

    #[test]
    fn literal_text_is_preserved() {
        let eval = evaluator(vec![map("m", &[("name", "World")])]);
        assert_eq!(resolve(&eval, "Hello ${name}!"), "Hello World!");
        assert_eq!(resolve(&eval, "no placeholders, $ and } alone"), "no placeholders, $ and } alone");
        assert_eq!(resolve(&eval, "ünïcödé ${name} ✓"), "ünïcödé World ✓");
    }

    #[test]
    fn recursive_values_are_resolved() {
        let eval = evaluator(vec![map("m", &[("a", "${b}"), ("b", "X")])]);
        assert_eq!(resolve(&eval, "${a}"), "X");
    }

    #[test]
    fn nested_expressions_resolve_innermost_first() {
        let eval = evaluator(vec![
            map("p", &[("profile", "dev")]),
            map("m", &[("dev.url", "jdbc:dev")]),
        ]);
        assert_eq!(resolve(&eval, "${m:${p:profile}.url}"), "jdbc:dev");
    }

    #[test]
    fn escape_emits_literal_placeholder() {
        let eval = evaluator(vec![map("m", &[("literal", "nope")])]);
        assert_eq!(resolve(&eval, r"\${literal}"), "${literal}");
        assert_eq!(resolve(&eval, r"\${literal} ${literal}"), "${literal} nope");
    }

    #[test]
    fn unresolved_is_masked_or_dropped() {
        let eval = evaluator(vec![map("m", &[])]);
        assert_eq!(resolve(&eval, "x=${missing}"), "x=?{missing}");
        assert_eq!(eval.resolve("x=${missing}", false, &ResolverScope::empty()), "x=");
        assert_eq!(resolve(&eval, "x=${open"), "x=${open");
    }

    #[test]
    fn cycles_are_masked() {
        let direct = evaluator(vec![map("m", &[("a", "${a}")])]);
        assert_eq!(resolve(&direct, "${a}"), "?{a}");

        let indirect = evaluator(vec![map("m", &[("a", "${b}"), ("b", "${a}")])]);
        assert_eq!(resolve(&indirect, "${a}"), "?{a}");
        assert_eq!(indirect.resolve("${a}", false, &ResolverScope::empty()), "");
    }

    #[test]
    fn key_in_flight_counts_as_cycle() {
        let conf = |key: &str| (key == "a").then(|| "${a}".to_string());
        let scope = ResolverScope::new(&conf);
        let eval = evaluator(vec![Arc::new(crate::resolvers::ConfResolver)]);
        assert_eq!(eval.resolve_key("a", "${a}", true, &scope), "?{a}");
    }

    #[test]
    fn depth_is_bounded() {
        let pairs: Vec<(String, String)> = (0..40)
            .map(|i| (format!("k{i}"), format!("${{k{}}}", i + 1)))
            .collect();
        let eval = evaluator(vec![Arc::new(MapResolver::new("m", pairs))]);
        assert_eq!(resolve(&eval, "${k0}"), "?{k32}");
    }

    #[test]
    fn fan_out_is_bounded() {
        let doubling = |levels: usize| -> Vec<(String, String)> {
            let mut pairs: Vec<(String, String)> = (0..levels)
                .map(|i| (format!("k{i}"), format!("${{k{n}}}${{k{n}}}", n = i + 1)))
                .collect();
            pairs.push((format!("k{levels}"), "x".to_string()));
            pairs
        };

        let small = evaluator(vec![Arc::new(MapResolver::new("m", doubling(5)))]);
        assert_eq!(resolve(&small, "${k0}"), "x".repeat(32));

        let huge = evaluator(vec![Arc::new(MapResolver::new("m", doubling(30)))]);
        let rendered = huge.render("${k0}", true, &ResolverScope::empty(), Vec::new());
        assert!(!rendered.complete);
        assert!(rendered.text.contains("?{k"));
        assert!(rendered.text.matches('x').count() < MAX_RESOLUTION_STEPS);
    }

    #[test]
    fn failing_resolver_falls_through() {
        let failing: Arc<dyn ExpressionResolver> = Arc::new(
            FnResolver::new("bad", |expr: &str| Err(ConfigError::resolution(expr, "backend down")))
                .with_priority(10),
        );
        let eval = evaluator(vec![failing, map("m", &[("k", "v")])]);
        assert_eq!(eval.chain_ids(), vec!["bad", "m"]);
        assert_eq!(resolve(&eval, "${k}"), "v");
        assert_eq!(resolve(&eval, "${bad:k}"), "?{bad:k}");
    }

    #[test]
    fn unknown_prefix_goes_to_default_chain() {
        let eval = evaluator(vec![map("m", &[("http://example.org", "ok")])]);
        assert_eq!(resolve(&eval, "${http://example.org}"), "ok");
        assert_eq!(resolve(&eval, "${m:http://example.org}"), "ok");
    }
}
