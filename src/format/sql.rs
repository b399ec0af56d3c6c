//! SQL family: one renderer behind three export modes (inline values,
//! positional placeholders, named placeholders).

use std::collections::HashMap;
use std::sync::Arc;

use super::{FormatOptions, GroupRef, Node, Resolved};
use crate::transform::coerce_numbers;
use crate::types::{Operator, Rule, RuleValue, ValueSource};
use crate::validate::ValidationState;

const FALLBACK: &str = "(1 = 1)";

/// SQL plus positional parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterizedSql {
    pub sql: String,
    pub params: Vec<RuleValue>,
}

/// SQL plus named parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedSql {
    pub sql: String,
    pub params: HashMap<String, RuleValue>,
}

/// How values reach the output: inline literals, `?`/`$n` placeholders, or
/// `:name` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlExportMode {
    Inline,
    Positional,
    Named,
}

/// Parameter accumulator for one render call. Placeholder names are unique
/// across the whole walk, not per rule.
#[derive(Debug, Default)]
pub struct ParamState {
    positional: Vec<RuleValue>,
    named: HashMap<String, RuleValue>,
    counters: HashMap<String, usize>,
}

impl ParamState {
    /// Allocate the next free name for a field: `field_1`, `field_2`, …
    /// Non-alphanumeric characters in the field name become underscores.
    pub fn next_named_param(&mut self, field: &str) -> String {
        let base: String = field
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let counter = self.counters.entry(base.clone()).or_insert(0);
        *counter += 1;
        format!("{base}_{counter}")
    }
}

/// Rendering context handed to custom rule and value processors.
///
/// Processors that introduce placeholders must allocate them through
/// [`SqlContext::bind`] (or [`SqlContext::next_named_param`] plus
/// [`SqlContext::bind_named`]) so names stay unique across the whole tree.
pub struct SqlContext<'a> {
    resolved: &'a Resolved,
    mode: SqlExportMode,
    params: &'a mut ParamState,
}

impl SqlContext<'_> {
    #[must_use]
    pub fn mode(&self) -> SqlExportMode {
        self.mode
    }

    /// Quote a field name per the active options.
    #[must_use]
    pub fn quote_field(&self, name: &str) -> String {
        self.resolved.quote_field(name)
    }

    /// Render a value as an inline literal, regardless of mode.
    #[must_use]
    pub fn literal(&self, value: &RuleValue) -> String {
        render_scalar(value, self.resolved.quote_values)
    }

    /// Turn a value into output text for the current mode: an inline
    /// literal, or a placeholder with the value recorded as a parameter.
    pub fn bind(&mut self, field: &str, value: RuleValue) -> String {
        match self.mode {
            SqlExportMode::Inline => self.literal(&value),
            SqlExportMode::Positional => {
                self.params.positional.push(value);
                if self.resolved.numbered_params {
                    format!("${}", self.params.positional.len())
                } else {
                    "?".to_owned()
                }
            }
            SqlExportMode::Named => {
                let name = self.params.next_named_param(field);
                self.bind_named(&name, value)
            }
        }
    }

    /// Allocate the next unique parameter name for a field.
    pub fn next_named_param(&mut self, field: &str) -> String {
        self.params.next_named_param(field)
    }

    /// Record a named parameter and return its placeholder text.
    pub fn bind_named(&mut self, name: &str, value: RuleValue) -> String {
        let key = if self.resolved.params_keep_prefix {
            format!("{}{name}", self.resolved.param_prefix)
        } else {
            name.to_owned()
        };
        self.params.named.insert(key, value);
        format!("{}{name}", self.resolved.param_prefix)
    }
}

/// Custom whole-rule renderer; `None` falls through to the default.
pub type RuleProcessor =
    Arc<dyn Fn(&Rule, &mut SqlContext<'_>) -> Option<String> + Send + Sync>;

/// Custom value renderer (everything after the operator keyword); `None`
/// falls through to the default.
pub type ValueProcessor =
    Arc<dyn Fn(&Rule, &mut SqlContext<'_>) -> Option<String> + Send + Sync>;

pub(crate) struct Rendered {
    pub(crate) sql: String,
    pub(crate) positional: Vec<RuleValue>,
    pub(crate) named: HashMap<String, RuleValue>,
}

pub(crate) fn render(
    query: GroupRef<'_>,
    options: &FormatOptions,
    mode: SqlExportMode,
) -> Rendered {
    let resolved = options.resolve();
    let state = ValidationState::compute(options.validator.as_ref(), query.as_query_ref());
    let mut params = ParamState::default();
    let sql = if state.tree_invalid() {
        resolved.fallback_or(FALLBACK)
    } else {
        let mut ctx = SqlContext {
            resolved: &resolved,
            mode,
            params: &mut params,
        };
        render_group(query, true, &state, options, &mut ctx)
    };
    Rendered {
        sql,
        positional: params.positional,
        named: params.named,
    }
}

fn render_group(
    group: GroupRef<'_>,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    ctx: &mut SqlContext<'_>,
) -> String {
    let fallback = ctx.resolved.fallback_or(FALLBACK);
    let children = match group.children() {
        Some(children) if state.id_is_valid(group.id()) => children,
        _ => {
            return if outermost_or_lonely {
                fallback
            } else {
                String::new()
            }
        }
    };
    if group.is_empty() {
        return fallback;
    }

    let lonely = group.raw_len() == 1;
    let (first, rest) = children;
    let mut joined = String::new();
    if let Some(node) = first {
        joined = render_node(node, lonely, state, options, ctx);
    }
    for (combinator, node) in rest {
        let fragment = render_node(node, lonely, state, options, ctx);
        if fragment.is_empty() {
            continue;
        }
        if joined.is_empty() {
            joined = fragment;
        } else {
            joined.push(' ');
            joined.push_str(combinator.as_str());
            joined.push(' ');
            joined.push_str(&fragment);
        }
    }

    let prefix = if group.not() { "NOT " } else { "" };
    format!("{prefix}({joined})")
}

fn render_node(
    node: Node<'_>,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    ctx: &mut SqlContext<'_>,
) -> String {
    match node {
        Node::Group(group) => render_group(group, outermost_or_lonely, state, options, ctx),
        Node::Rule(rule) => render_rule(rule, state, options, ctx),
    }
}

fn render_rule(
    rule: &Rule,
    state: &ValidationState,
    options: &FormatOptions,
    ctx: &mut SqlContext<'_>,
) -> String {
    if ctx.resolved.is_placeholder(rule) {
        return String::new();
    }
    if !state.rule_is_valid(rule, options.fields.as_ref()) {
        return String::new();
    }
    if let Some(processor) = &options.rule_processor {
        if let Some(sql) = processor(rule, ctx) {
            return sql;
        }
    }
    default_rule(rule, options, ctx)
}

fn default_rule(rule: &Rule, options: &FormatOptions, ctx: &mut SqlContext<'_>) -> String {
    let field = ctx.quote_field(&rule.field);
    let value = if ctx.resolved.parse_numbers {
        coerce_numbers(&rule.value)
    } else {
        rule.value.clone()
    };
    let field_sourced = rule.value_source() == ValueSource::Field;

    match &rule.operator {
        Operator::Null => return format!("{field} is null"),
        Operator::NotNull => return format!("{field} is not null"),
        _ => {}
    }

    let keyword = match &rule.operator {
        Operator::Contains | Operator::BeginsWith | Operator::EndsWith => "like",
        Operator::DoesNotContain | Operator::DoesNotBeginWith | Operator::DoesNotEndWith => {
            "not like"
        }
        Operator::In => "in",
        Operator::NotIn => "not in",
        Operator::Between => "between",
        Operator::NotBetween => "not between",
        other => other.as_str(),
    };

    let value_part = match value_text(rule, &value, field_sourced, options, ctx) {
        Some(text) => text,
        None => return String::new(),
    };
    format!("{field} {keyword} {value_part}")
}

/// Everything after the operator keyword, or `None` to drop the rule.
fn value_text(
    rule: &Rule,
    value: &RuleValue,
    field_sourced: bool,
    options: &FormatOptions,
    ctx: &mut SqlContext<'_>,
) -> Option<String> {
    if let Some(processor) = &options.value_processor {
        if let Some(text) = processor(rule, ctx) {
            return Some(text);
        }
    }

    match &rule.operator {
        Operator::Contains | Operator::DoesNotContain => {
            wildcard(&rule.field, value, field_sourced, true, true, ctx)
        }
        Operator::BeginsWith | Operator::DoesNotBeginWith => {
            wildcard(&rule.field, value, field_sourced, false, true, ctx)
        }
        Operator::EndsWith | Operator::DoesNotEndWith => {
            wildcard(&rule.field, value, field_sourced, true, false, ctx)
        }
        Operator::In | Operator::NotIn => {
            let items = super::coerced_list(value, ctx.resolved.parse_numbers);
            if items.is_empty() {
                return None;
            }
            let rendered: Vec<String> = items
                .into_iter()
                .map(|item| operand(rule, item, field_sourced, ctx))
                .collect::<Option<_>>()?;
            Some(format!("({})", rendered.join(", ")))
        }
        Operator::Between | Operator::NotBetween => {
            let items = super::coerced_list(value, ctx.resolved.parse_numbers);
            if items.len() < 2 {
                return None;
            }
            let low = operand(rule, items[0].clone(), field_sourced, ctx)?;
            let high = operand(rule, items[1].clone(), field_sourced, ctx)?;
            Some(format!("{low} and {high}"))
        }
        _ => operand(rule, value.clone(), field_sourced, ctx),
    }
}

/// A single comparison operand: a quoted identifier when the rule is
/// field-sourced, otherwise a bound value.
fn operand(
    rule: &Rule,
    value: RuleValue,
    field_sourced: bool,
    ctx: &mut SqlContext<'_>,
) -> Option<String> {
    if field_sourced {
        let name = value.as_str()?.to_owned();
        Some(ctx.quote_field(&name))
    } else {
        Some(ctx.bind(&rule.field, value))
    }
}

/// LIKE pattern with `%` on the requested sides. Field-sourced values
/// concatenate the identifier with `%` using the configured operator.
fn wildcard(
    field: &str,
    value: &RuleValue,
    field_sourced: bool,
    leading: bool,
    trailing: bool,
    ctx: &mut SqlContext<'_>,
) -> Option<String> {
    if field_sourced {
        let name = value.as_str()?;
        let ident = ctx.quote_field(name);
        let quote = ctx.resolved.quote_values;
        let pct = format!("{quote}%{quote}");
        if ctx.resolved.concat.eq_ignore_ascii_case("CONCAT") {
            let mut args = Vec::new();
            if leading {
                args.push(pct.clone());
            }
            args.push(ident);
            if trailing {
                args.push(pct);
            }
            return Some(format!("CONCAT({})", args.join(", ")));
        }
        let op = &ctx.resolved.concat;
        let mut out = String::new();
        if leading {
            out.push_str(&pct);
            out.push_str(&format!(" {op} "));
        }
        out.push_str(&ident);
        if trailing {
            out.push_str(&format!(" {op} "));
            out.push_str(&pct);
        }
        return Some(out);
    }

    let text = match value {
        RuleValue::String(s) => s.clone(),
        RuleValue::Null | RuleValue::List(_) => return None,
        other => other.to_string(),
    };
    let pattern = format!(
        "{}{text}{}",
        if leading { "%" } else { "" },
        if trailing { "%" } else { "" }
    );
    Some(ctx.bind(field, RuleValue::String(pattern)))
}

fn render_scalar(value: &RuleValue, quote: char) -> String {
    match value {
        RuleValue::Null => "NULL".to_owned(),
        RuleValue::Bool(true) => "TRUE".to_owned(),
        RuleValue::Bool(false) => "FALSE".to_owned(),
        RuleValue::Int(i) => i.to_string(),
        RuleValue::Float(f) => f.to_string(),
        RuleValue::String(s) => {
            let escaped: String = s
                .chars()
                .flat_map(|c| {
                    if c == quote {
                        vec![c, c]
                    } else {
                        vec![c]
                    }
                })
                .collect();
            format!("{quote}{escaped}{quote}")
        }
        RuleValue::List(items) => {
            let rendered: Vec<String> =
                items.iter().map(|item| render_scalar(item, quote)).collect();
            format!("({})", rendered.join(", "))
        }
    }
}
