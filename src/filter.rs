//! Build event filters
//!
//! A filter expression is compiled once at setup into a [`FilterPredicate`].
//! The language covers the comparisons notifier configs use in practice:
//!
//! ```text
//! build.status == Build.Status.SUCCESS && build.substitutions['_APP_NAME'] != 'scratch'
//! build.status in [Build.Status.FAILURE, Build.Status.TIMEOUT] || !(build.project_id == "prod")
//! ```
//!
//! Every field resolves to a string (missing substitutions resolve to `""`),
//! so evaluation cannot fail once compilation succeeded.

use std::borrow::Cow;

use crate::build_event::{BuildEvent, BuildStatus};
use crate::error::NotifierError;

/// Deepest `!` / parenthesis nesting accepted by the parser
const MAX_NESTING: usize = 64;

/// Predicate over build events, evaluated by the dispatch gate
pub trait EventFilter: Send + Sync {
    fn apply(&self, event: &BuildEvent) -> bool;
}

/// Compiled filter expression
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    source: String,
    expr: Expr,
}

impl FilterPredicate {
    /// Original expression text
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl EventFilter for FilterPredicate {
    fn apply(&self, event: &BuildEvent) -> bool {
        self.expr.eval(event)
    }
}

/// Compile a filter expression
pub fn compile_filter(expression: &str) -> Result<FilterPredicate, NotifierError> {
    let invalid = |message: String| NotifierError::InvalidFilter {
        expression: expression.to_string(),
        message,
    };

    let tokens = tokenize(expression).map_err(invalid)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression".to_string()));
    }

    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.parse_or().map_err(invalid)?;
    if let Some(token) = parser.peek() {
        return Err(invalid(format!("unexpected {} after expression", token.describe())));
    }

    Ok(FilterPredicate {
        source: expression.to_string(),
        expr,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Id,
    Status,
    ProjectId,
    LogUrl,
    Substitution(String),
    RepoName,
    BranchName,
    CommitSha,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(String),
    Field(Field),
}

impl Operand {
    fn resolve<'a>(&'a self, event: &'a BuildEvent) -> Cow<'a, str> {
        match self {
            Operand::Literal(value) => Cow::Borrowed(value),
            Operand::Field(field) => match field {
                Field::Id => Cow::Borrowed(&event.id),
                Field::Status => Cow::Borrowed(event.status.as_str()),
                Field::ProjectId => Cow::Borrowed(&event.project_id),
                Field::LogUrl => Cow::Borrowed(&event.log_url),
                Field::Substitution(key) => Cow::Borrowed(event.substitution(key)),
                Field::RepoName => Cow::Borrowed(event.repo_name().unwrap_or("")),
                Field::BranchName => Cow::Borrowed(
                    event.repo_source().and_then(|r| r.branch_name.as_deref()).unwrap_or(""),
                ),
                Field::CommitSha => Cow::Borrowed(
                    event.repo_source().and_then(|r| r.commit_sha.as_deref()).unwrap_or(""),
                ),
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    In(Operand, Vec<Operand>),
    Not(Box<Expr>),
    /// Conjunction of an `&&` chain, kept flat
    All(Vec<Expr>),
    /// Disjunction of an `||` chain, kept flat
    Any(Vec<Expr>),
}

impl Expr {
    fn eval(&self, event: &BuildEvent) -> bool {
        match self {
            Expr::Eq(lhs, rhs) => lhs.resolve(event) == rhs.resolve(event),
            Expr::Ne(lhs, rhs) => lhs.resolve(event) != rhs.resolve(event),
            Expr::In(needle, haystack) => {
                let needle = needle.resolve(event);
                haystack.iter().any(|item| item.resolve(event) == needle)
            }
            Expr::Not(inner) => !inner.eval(event),
            Expr::All(terms) => terms.iter().all(|term| term.eval(event)),
            Expr::Any(terms) => terms.iter().any(|term| term.eval(event)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Str(value) => format!("string {:?}", value),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Eq => "'=='".to_string(),
            Token::Ne => "'!='".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::Not => "'!'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '.' => tokens.push(Token::Dot),
            ',' => tokens.push(Token::Comma),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '=' => match chars.next() {
                Some((_, '=')) => tokens.push(Token::Eq),
                _ => return Err(format!("expected '==' at offset {}", pos)),
            },
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => match chars.next() {
                Some((_, '&')) => tokens.push(Token::And),
                _ => return Err(format!("expected '&&' at offset {}", pos)),
            },
            '|' => match chars.next() {
                Some((_, '|')) => tokens.push(Token::Or),
                _ => return Err(format!("expected '||' at offset {}", pos)),
            },
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(format!("unterminated string starting at offset {}", pos));
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{}' at offset {}", other, pos)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {}, found {}", expected.describe(), token.describe())),
            None => Err(format!("expected {}, found end of expression", expected.describe())),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::Any(terms) })
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::All(terms) })
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err("expression nested too deeply".to_string());
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Not) {
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.eat(&Token::LParen) {
            self.enter()?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_operand()?;
        match self.next() {
            Some(Token::Eq) => Ok(Expr::Eq(lhs, self.parse_operand()?)),
            Some(Token::Ne) => Ok(Expr::Ne(lhs, self.parse_operand()?)),
            Some(Token::Ident(ref kw)) if kw == "in" => {
                self.expect(Token::LBracket)?;
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_operand()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(Token::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::In(lhs, items))
            }
            Some(token) => Err(format!("expected comparison operator, found {}", token.describe())),
            None => Err("expected comparison operator, found end of expression".to_string()),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.next() {
            Some(Token::Str(value)) => Ok(Operand::Literal(value)),
            Some(Token::Ident(root)) => {
                let mut path = vec![root];
                loop {
                    if self.eat(&Token::Dot) {
                        match self.next() {
                            Some(Token::Ident(segment)) => path.push(segment),
                            Some(token) => {
                                return Err(format!("expected field name after '.', found {}", token.describe()))
                            }
                            None => return Err("expected field name after '.'".to_string()),
                        }
                    } else if self.eat(&Token::LBracket) {
                        match self.next() {
                            Some(Token::Str(key)) => path.push(key),
                            Some(token) => {
                                return Err(format!("expected string index, found {}", token.describe()))
                            }
                            None => return Err("expected string index".to_string()),
                        }
                        self.expect(Token::RBracket)?;
                    } else {
                        break;
                    }
                }
                resolve_path(&path)
            }
            Some(token) => Err(format!("expected operand, found {}", token.describe())),
            None => Err("expected operand, found end of expression".to_string()),
        }
    }
}

fn resolve_path(path: &[String]) -> Result<Operand, String> {
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    match segments.as_slice() {
        ["Build", "Status", name] => match BuildStatus::from(*name) {
            BuildStatus::Unrecognized(_) => Err(format!("unknown build status '{}'", name)),
            status => Ok(Operand::Literal(status.as_str().to_string())),
        },
        ["build", "id"] => Ok(Operand::Field(Field::Id)),
        ["build", "status"] => Ok(Operand::Field(Field::Status)),
        ["build", "project_id" | "projectId"] => Ok(Operand::Field(Field::ProjectId)),
        ["build", "log_url" | "logUrl"] => Ok(Operand::Field(Field::LogUrl)),
        ["build", "substitutions", key] => Ok(Operand::Field(Field::Substitution(key.to_string()))),
        ["build", "source", "repo_source" | "repoSource", "repo_name" | "repoName"] => {
            Ok(Operand::Field(Field::RepoName))
        }
        ["build", "source", "repo_source" | "repoSource", "branch_name" | "branchName"] => {
            Ok(Operand::Field(Field::BranchName))
        }
        ["build", "source", "repo_source" | "repoSource", "commit_sha" | "commitSha"] => {
            Ok(Operand::Field(Field::CommitSha))
        }
        _ => Err(format!("unknown field '{}'", path.join("."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: BuildStatus, app_name: &str) -> BuildEvent {
        BuildEvent::new("build-1", status)
            .with_project_id("prod")
            .with_substitution("_APP_NAME", app_name)
    }

    #[test]
    fn test_status_equality() {
        let filter = compile_filter("build.status == Build.Status.SUCCESS").unwrap();
        assert!(filter.apply(&event(BuildStatus::Success, "app")));
        assert!(!filter.apply(&event(BuildStatus::Working, "app")));
        assert_eq!(filter.source(), "build.status == Build.Status.SUCCESS");
    }

    #[test]
    fn test_substitution_index_and_dot_access() {
        let indexed = compile_filter("build.substitutions['_APP_NAME'] == 'scratch'").unwrap();
        let dotted = compile_filter("build.substitutions._APP_NAME == \"scratch\"").unwrap();
        let e = event(BuildStatus::Success, "scratch");
        assert!(indexed.apply(&e));
        assert!(dotted.apply(&e));
        assert!(!indexed.apply(&event(BuildStatus::Success, "api")));
    }

    #[test]
    fn test_missing_substitution_is_empty_string() {
        let filter = compile_filter("build.substitutions['_MISSING'] == ''").unwrap();
        assert!(filter.apply(&event(BuildStatus::Success, "app")));
    }

    #[test]
    fn test_in_list_and_boolean_operators() {
        let filter = compile_filter(
            "build.status in [Build.Status.FAILURE, Build.Status.TIMEOUT] && !(build.project_id == 'dev')",
        )
        .unwrap();
        assert!(filter.apply(&event(BuildStatus::Timeout, "app")));
        assert!(!filter.apply(&event(BuildStatus::Success, "app")));

        let dev = event(BuildStatus::Failure, "app").with_project_id("dev");
        assert!(!filter.apply(&dev));
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let filter = compile_filter(
            "build.id == 'x' && build.status == Build.Status.WORKING || build.projectId == 'prod'",
        )
        .unwrap();
        // (false && ..) || true
        assert!(filter.apply(&event(BuildStatus::Success, "app")));
    }

    #[test]
    fn test_repo_name_field() {
        let filter = compile_filter("build.source.repoSource.repoName != ''").unwrap();
        assert!(!filter.apply(&event(BuildStatus::Success, "app")));
        assert!(filter.apply(&event(BuildStatus::Success, "app").with_repo_name("repo")));
    }

    #[test]
    fn test_branch_and_commit_fields() {
        let event = BuildEvent::from_json(
            r#"{"id": "b1", "source": {"repoSource": {"repoName": "api", "branchName": "main", "commitSha": "abc123"}}}"#,
        )
        .unwrap();
        let filter = compile_filter(
            "build.source.repoSource.branchName == 'main' && build.source.repo_source.commit_sha != ''",
        )
        .unwrap();
        assert!(filter.apply(&event));
        assert!(!filter.apply(&BuildEvent::new("b2", BuildStatus::Success)));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let negated = format!("{}build.id == 'x'", "!".repeat(200_000));
        let result = compile_filter(&negated);
        match result {
            Err(NotifierError::InvalidFilter { message, .. }) => {
                assert_eq!(message, "expression nested too deeply")
            }
            other => panic!("expected InvalidFilter, got {:?}", other.map(|f| f.source().len())),
        }

        let parens = format!("{}build.id == 'x'{}", "(".repeat(1_000), ")".repeat(1_000));
        assert!(matches!(compile_filter(&parens), Err(NotifierError::InvalidFilter { .. })));
    }

    #[test]
    fn test_nesting_within_limit_compiles() {
        let filter = compile_filter(&format!("{}build.id == 'x'", "!!".repeat(MAX_NESTING / 2))).unwrap();
        assert!(!filter.apply(&event(BuildStatus::Success, "app")));
    }

    #[test]
    fn test_long_and_chain_evaluates() {
        let chain = vec!["build.projectId == 'prod'"; 50_000].join(" && ");
        let filter = compile_filter(&chain).unwrap();
        assert!(filter.apply(&event(BuildStatus::Success, "app")));
        assert!(!filter.apply(&event(BuildStatus::Success, "app").with_project_id("dev")));
    }

    #[test]
    fn test_invalid_expressions_are_rejected() {
        for expr in [
            "",
            "build.status ==",
            "build.status = 'SUCCESS'",
            "build.unknown == 'x'",
            "build.status == Build.Status.NOPE",
            "'unterminated",
            "build.status == 'SUCCESS' extra",
            "(build.id == 'x'",
            "build.id",
            "build.id == 'a' & build.id == 'b'",
        ] {
            let result = compile_filter(expr);
            assert!(
                matches!(result, Err(NotifierError::InvalidFilter { .. })),
                "expected compile error for {:?}",
                expr
            );
        }
    }
}
