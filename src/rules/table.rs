use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::aggregate::AggregationKind;
use crate::ast::{BinaryOp, UnaryOp};
use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::rules::template::{Piece, Template};
use crate::types::DataType;

/// What a rule implements.
///
/// Calls (`Func`, `Meth`, `Attr`) are further distinguished by the name token
/// in the rule's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Func,
    Meth,
    Attr,
    Aggregate(AggregationKind),
    /// `a if c else b`, whose rules are synthesized during validation
    IfElse,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Unary(op) => write!(f, "unop_{}", op.name()),
            Operator::Binary(op) => write!(f, "binop_{}", op.name()),
            Operator::Func => write!(f, "func"),
            Operator::Meth => write!(f, "meth"),
            Operator::Attr => write!(f, "attr"),
            Operator::Aggregate(kind) => write!(f, "aggregate_{}", kind),
            Operator::IfElse => write!(f, "ternop_if"),
        }
    }
}

/// One element of a rule signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sig {
    /// A positional operand of this type (or a narrower one)
    Type(DataType),
    /// A literal function, method or attribute name
    Name(String),
}

/// A typed call signature mapped to a result type and an SQL template
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub operator: Operator,
    pub result: DataType,
    pub signature: Vec<Sig>,
    pub template: Template,
}

impl Rule {
    /// The name token of a call rule
    pub fn name(&self) -> Option<&str> {
        self.signature.iter().find_map(|sig| match sig {
            Sig::Name(name) => Some(name.as_str()),
            Sig::Type(_) => None,
        })
    }

    /// Operand types, in child order
    pub fn types(&self) -> Vec<DataType> {
        self.signature
            .iter()
            .filter_map(|sig| match sig {
                Sig::Type(t) => Some(*t),
                Sig::Name(_) => None,
            })
            .collect()
    }

    fn accepts(&self, types: &[DataType]) -> bool {
        let own = self.types();
        own.len() == types.len() && types.iter().zip(&own).all(|(arg, param)| arg.widens_to(*param))
    }

    fn signature_text(&self) -> String {
        let parts: Vec<String> = self
            .signature
            .iter()
            .map(|sig| match sig {
                Sig::Type(t) => t.label(),
                Sig::Name(name) => name.clone(),
            })
            .collect();
        format!("{}({})", self.operator, parts.join(", "))
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <- {}: {}", self.result.label(), self.signature_text(), self.template)
    }
}

/// Outcome of looking up a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Rule(Arc<Rule>),
    /// Rules exist for the operator (and name), but none accepts the types
    NoMatch,
    /// No rule carries the requested function/method/attribute name
    UnknownName,
}

type RuleKey = (Operator, Option<String>);

/// The immutable rules of one dialect
#[derive(Debug)]
pub struct RuleTable {
    dialect: Dialect,
    rules: Vec<Arc<Rule>>,
    by_key: HashMap<RuleKey, Vec<Arc<Rule>>>,
}

impl RuleTable {
    pub fn builder(dialect: Dialect) -> RuleTableBuilder {
        RuleTableBuilder {
            dialect,
            rules: Vec::new(),
            error: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules in registration order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    /// Find the rule for an operator applied to operands of the given types.
    ///
    /// An exact match wins; otherwise the narrowest rule all operand types
    /// widen to is chosen. The build-time checks guarantee that this rule is
    /// unique, so the `AmbiguousRules` error only shows up for tables that
    /// bypassed [`RuleTableBuilder::build`].
    pub fn resolve(
        &self,
        operator: Operator,
        name: Option<&str>,
        types: &[DataType],
    ) -> Result<Resolution, CompileError> {
        let key = (operator, name.map(str::to_string));
        let Some(candidates) = self.by_key.get(&key) else {
            trace!(%operator, ?name, "no rules registered");
            return Ok(if name.is_some() {
                Resolution::UnknownName
            } else {
                Resolution::NoMatch
            });
        };

        if let Some(exact) = candidates.iter().find(|rule| rule.types() == types) {
            trace!(rule = %exact, "exact rule match");
            return Ok(Resolution::Rule(Arc::clone(exact)));
        }

        let matching: Vec<&Arc<Rule>> = candidates.iter().filter(|rule| rule.accepts(types)).collect();
        if matching.is_empty() {
            trace!(%operator, ?name, ?types, "no rule accepts operand types");
            return Ok(Resolution::NoMatch);
        }

        let narrowest = matching.iter().find(|rule| {
            let own = rule.types();
            matching.iter().all(|other| pointwise_le(&own, &other.types()))
        });
        match narrowest {
            Some(rule) => {
                trace!(rule = %rule, "widening rule match");
                Ok(Resolution::Rule(Arc::clone(rule)))
            }
            None => Err(CompileError::AmbiguousRules {
                operator: operator.to_string(),
                first: matching[0].signature_text(),
                second: matching[1].signature_text(),
            }),
        }
    }

    /// Template turning its single child, a value of type `t`, into a 0/1 flag.
    ///
    /// `bool` values already are flags; everything else goes through the
    /// `bool()` conversion rule.
    pub fn truth(&self, t: DataType) -> Result<Option<Template>, CompileError> {
        if t == DataType::Bool {
            return Ok(Some(Template::from_pieces(vec![Piece::Child(0)])));
        }
        match self.resolve(Operator::Func, Some("bool"), &[t])? {
            Resolution::Rule(rule) => Ok(Some(rule.template.clone())),
            Resolution::NoMatch | Resolution::UnknownName => Ok(None),
        }
    }
}

fn pointwise_le(a: &[DataType], b: &[DataType]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.widens_to(*y))
}

fn pointwise_meet(a: &[DataType], b: &[DataType]) -> Option<Vec<DataType>> {
    if a.len() != b.len() {
        return None;
    }
    a.iter().zip(b).map(|(x, y)| DataType::meet(*x, *y)).collect()
}

/// Collects rules and checks them for consistency
#[derive(Debug)]
pub struct RuleTableBuilder {
    dialect: Dialect,
    rules: Vec<Rule>,
    error: Option<CompileError>,
}

impl RuleTableBuilder {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Register a rule. Template errors are reported by [`build`](Self::build).
    pub fn rule(&mut self, operator: Operator, result: DataType, signature: Vec<Sig>, template: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let arity = signature.iter().filter(|sig| matches!(sig, Sig::Type(_))).count();
        match Template::parse(template, arity) {
            Ok(template) => self.rules.push(Rule {
                operator,
                result,
                signature,
                template,
            }),
            Err(message) => {
                self.error = Some(CompileError::InvalidTemplate {
                    operator: operator.to_string(),
                    message,
                })
            }
        }
        self
    }

    pub fn unary(&mut self, op: UnaryOp, result: DataType, operand: DataType, template: &str) -> &mut Self {
        self.rule(Operator::Unary(op), result, vec![Sig::Type(operand)], template)
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        result: DataType,
        left: DataType,
        right: DataType,
        template: &str,
    ) -> &mut Self {
        self.rule(
            Operator::Binary(op),
            result,
            vec![Sig::Type(left), Sig::Type(right)],
            template,
        )
    }

    pub fn func(&mut self, name: &str, result: DataType, args: &[DataType], template: &str) -> &mut Self {
        let mut signature = vec![Sig::Name(name.to_string())];
        signature.extend(args.iter().map(|t| Sig::Type(*t)));
        self.rule(Operator::Func, result, signature, template)
    }

    pub fn meth(
        &mut self,
        obj: DataType,
        name: &str,
        result: DataType,
        args: &[DataType],
        template: &str,
    ) -> &mut Self {
        let mut signature = vec![Sig::Type(obj), Sig::Name(name.to_string())];
        signature.extend(args.iter().map(|t| Sig::Type(*t)));
        self.rule(Operator::Meth, result, signature, template)
    }

    pub fn attr(&mut self, obj: DataType, name: &str, result: DataType, template: &str) -> &mut Self {
        self.rule(
            Operator::Attr,
            result,
            vec![Sig::Type(obj), Sig::Name(name.to_string())],
            template,
        )
    }

    pub fn aggregate(&mut self, kind: AggregationKind, result: DataType, arg: DataType, template: &str) -> &mut Self {
        self.rule(Operator::Aggregate(kind), result, vec![Sig::Type(arg)], template)
    }

    /// Freeze the table.
    ///
    /// Fails if two rules share a signature, or if two overlapping rules are
    /// incomparable and no rule exists for their pointwise meet (which would
    /// make resolution of the overlapping operand types ambiguous).
    pub fn build(self) -> Result<RuleTable, CompileError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let rules: Vec<Arc<Rule>> = self.rules.into_iter().map(Arc::new).collect();
        let mut by_key: HashMap<RuleKey, Vec<Arc<Rule>>> = HashMap::new();
        for rule in &rules {
            let key = (rule.operator, rule.name().map(str::to_string));
            by_key.entry(key).or_default().push(Arc::clone(rule));
        }

        for group in by_key.values() {
            check_group(group)?;
        }

        debug!(dialect = %self.dialect, rules = rules.len(), "built rule table");
        Ok(RuleTable {
            dialect: self.dialect,
            rules,
            by_key,
        })
    }
}

fn check_group(group: &[Arc<Rule>]) -> Result<(), CompileError> {
    let signatures: Vec<Vec<DataType>> = group.iter().map(|rule| rule.types()).collect();
    for (i, first) in signatures.iter().enumerate() {
        for (j, second) in signatures.iter().enumerate().skip(i + 1) {
            if first == second {
                return Err(CompileError::DuplicateRule {
                    operator: group[i].operator.to_string(),
                    signature: group[i].signature_text(),
                });
            }
            if pointwise_le(first, second) || pointwise_le(second, first) {
                continue;
            }
            if let Some(meet) = pointwise_meet(first, second) {
                if !signatures.contains(&meet) {
                    return Err(CompileError::AmbiguousRules {
                        operator: group[i].operator.to_string(),
                        first: group[i].signature_text(),
                        second: group[j].signature_text(),
                    });
                }
            }
        }
    }
    Ok(())
}
