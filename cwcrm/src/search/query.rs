//! Query-string parsing and evaluation for the in-memory index.
//!
//! Understands the query-string syntax exposed by the search endpoint: bare terms, `field:value`,
//! `field:(a OR b)`, quoted phrases, `AND` / `OR` / `NOT` (and `&&`, `||`, `!`), `+` / `-`
//! modifiers, parentheses and `*` / `?` wildcards. Text is split on non-alphanumeric characters
//! and compared lowercase. The default operator is `OR`.
//!
//! Clauses follow the usual boolean rules: every `must` clause has to match, no `must_not` clause
//! may match, and when there are no `must` clauses at least one `should` clause has to match. A
//! query made only of exclusions matches every document that isn't excluded.

use super::{Result, SearchError};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Phrase(String),
    Field(String),
    And,
    Or,
    Not,
    Plus,
    Minus,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(word) => format!("'{word}'"),
            Token::Phrase(phrase) => format!("\"{phrase}\""),
            Token::Field(field) => format!("'{field}:'"),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Not => "NOT".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn invalid(message: impl Into<String>) -> SearchError {
    SearchError::InvalidQuery(message.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    // +, - and ! are modifiers only in front of a term
    let mut at_term_start = true;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
                at_term_start = true;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
                at_term_start = true;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
                at_term_start = true;
            }
            '"' => {
                i += 1;
                let mut phrase = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            phrase.push(chars[i + 1]);
                            i += 2;
                        }
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        other => {
                            phrase.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(invalid("unterminated quoted phrase"));
                }
                tokens.push(Token::Phrase(phrase));
                at_term_start = false;
            }
            '+' | '-' | '!' if at_term_start => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    _ => Token::Not,
                });
                i += 1;
            }
            _ => {
                let mut word = String::new();
                let mut is_field = false;
                while i < chars.len() {
                    match chars[i] {
                        c if c.is_whitespace() || c == '(' || c == ')' || c == '"' => break,
                        '\\' => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                word.push(escaped);
                            }
                            i += 2;
                        }
                        ':' => {
                            is_field = true;
                            i += 1;
                            break;
                        }
                        other => {
                            word.push(other);
                            i += 1;
                        }
                    }
                }

                if is_field {
                    if word.is_empty() {
                        return Err(invalid("missing field name before ':'"));
                    }
                    tokens.push(Token::Field(word));
                    at_term_start = false;
                    continue;
                }

                match word.as_str() {
                    "" => {}
                    "AND" | "&&" => tokens.push(Token::And),
                    "OR" | "||" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Word(word)),
                }
                at_term_start = false;
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Must,
    Should,
    MustNot,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    MatchAll,
    Term { field: Option<String>, text: String },
    Wildcard { field: Option<String>, pattern: String },
    Phrase { field: Option<String>, tokens: Vec<String> },
    Bool(Vec<(Occur, Node)>),
}

/// Split text into lowercase alphanumeric tokens.
fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_node(field: Option<&str>, word: &str) -> Node {
    if word == "*" && field.is_none() {
        return Node::MatchAll;
    }

    let field = field.map(str::to_string);
    if word.contains(['*', '?']) {
        return Node::Wildcard {
            field,
            pattern: word.to_lowercase(),
        };
    }

    let mut tokens = analyze(word);
    if tokens.len() == 1 {
        Node::Term {
            field,
            text: tokens.remove(0),
        }
    } else {
        // `foo-bar` analyzes to several terms, any of which may match
        Node::Bool(
            tokens
                .into_iter()
                .map(|text| {
                    (
                        Occur::Should,
                        Node::Term {
                            field: field.clone(),
                            text,
                        },
                    )
                })
                .collect(),
        )
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_bool(&mut self, field: Option<&str>, nested: bool) -> Result<Node> {
        let mut clauses: Vec<(Occur, Node)> = Vec::new();
        let mut conjunction: Option<Token> = None;

        loop {
            match self.peek() {
                None => break,
                Some(Token::RParen) if nested => break,
                Some(Token::RParen) => return Err(invalid("unexpected ')'")),
                Some(token @ (Token::And | Token::Or)) => {
                    if clauses.is_empty() || conjunction.is_some() {
                        return Err(invalid(format!("unexpected {}", token.describe())));
                    }
                    conjunction = self.next();
                }
                Some(_) => {
                    let modifier = match self.peek() {
                        Some(Token::Plus) => Some(Occur::Must),
                        Some(Token::Minus | Token::Not) => Some(Occur::MustNot),
                        _ => None,
                    };
                    if modifier.is_some() {
                        self.pos += 1;
                    }

                    let node = self.parse_primary(field)?;

                    // `a AND b` makes `a` required too
                    if conjunction == Some(Token::And) {
                        if let Some((occur @ Occur::Should, _)) = clauses.last_mut() {
                            *occur = Occur::Must;
                        }
                    }

                    let occur = match (modifier, &conjunction) {
                        (Some(occur), _) => occur,
                        (None, Some(Token::And)) => Occur::Must,
                        (None, _) => Occur::Should,
                    };
                    clauses.push((occur, node));
                    conjunction = None;
                }
            }
        }

        if let Some(token) = conjunction {
            return Err(invalid(format!("{} is missing its right-hand side", token.describe())));
        }
        if nested && clauses.is_empty() {
            return Err(invalid("empty group '()'"));
        }
        Ok(Node::Bool(clauses))
    }

    fn parse_primary(&mut self, field: Option<&str>) -> Result<Node> {
        match self.next() {
            Some(Token::Word(word)) => Ok(term_node(field, &word)),
            Some(Token::Phrase(phrase)) => Ok(Node::Phrase {
                field: field.map(str::to_string),
                tokens: analyze(&phrase),
            }),
            Some(Token::Field(name)) => match self.peek() {
                Some(Token::Word(_) | Token::Phrase(_) | Token::LParen) => {
                    // `*:value` searches every field
                    let scoped = (name != "*").then_some(name.as_str());
                    self.parse_primary(scoped)
                }
                _ => Err(invalid(format!("missing value for field '{name}'"))),
            },
            Some(Token::LParen) => {
                let node = self.parse_bool(field, true)?;
                match self.next() {
                    Some(Token::RParen) => Ok(node),
                    _ => Err(invalid("missing closing ')'")),
                }
            }
            Some(token) => Err(invalid(format!("unexpected {}", token.describe()))),
            None => Err(invalid("unexpected end of query")),
        }
    }
}

/// A document flattened to `(field path, tokens)` pairs. Nested objects use dotted paths.
type Fields = Vec<(String, Vec<String>)>;

fn flatten(path: &str, value: &Value, out: &mut Fields) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let nested = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten(&nested, value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(path, item, out);
            }
        }
        Value::String(text) => out.push((path.to_string(), analyze(text))),
        Value::Number(number) => out.push((path.to_string(), vec![number.to_string()])),
        Value::Bool(flag) => out.push((path.to_string(), vec![flag.to_string()])),
        Value::Null => {}
    }
}

fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

impl Node {
    fn tokens_in<'a>(field: &'a Option<String>, fields: &'a Fields) -> impl Iterator<Item = &'a Vec<String>> {
        fields
            .iter()
            .filter(move |(path, _)| field.as_ref().is_none_or(|field| field == path))
            .map(|(_, tokens)| tokens)
    }

    /// `None` when the document doesn't match, otherwise the number of matching scoring clauses.
    fn score(&self, fields: &Fields) -> Option<u32> {
        match self {
            Node::MatchAll => Some(1),
            Node::Term { field, text } => {
                Self::tokens_in(field, fields).any(|tokens| tokens.contains(text)).then_some(1)
            }
            Node::Wildcard { field, pattern } => {
                let pattern: Vec<char> = pattern.chars().collect();
                Self::tokens_in(field, fields)
                    .flatten()
                    .any(|token| wildcard_match(&pattern, &token.chars().collect::<Vec<_>>()))
                    .then_some(1)
            }
            Node::Phrase { field, tokens: phrase } => {
                if phrase.is_empty() {
                    return None;
                }
                Self::tokens_in(field, fields)
                    .any(|tokens| tokens.windows(phrase.len()).any(|window| window == phrase.as_slice()))
                    .then_some(1)
            }
            Node::Bool(clauses) => {
                if clauses.is_empty() {
                    return None;
                }

                let mut score = 0;
                let mut has_must = false;
                let mut has_should = false;
                let mut should_matched = false;
                for (occur, node) in clauses {
                    let clause_score = node.score(fields);
                    match occur {
                        Occur::MustNot => {
                            if clause_score.is_some() {
                                return None;
                            }
                        }
                        Occur::Must => {
                            has_must = true;
                            score += clause_score?;
                        }
                        Occur::Should => {
                            has_should = true;
                            if let Some(clause_score) = clause_score {
                                should_matched = true;
                                score += clause_score;
                            }
                        }
                    }
                }

                if !has_must && has_should && !should_matched {
                    return None;
                }
                Some(score)
            }
        }
    }
}

/// A parsed query-string query.
#[derive(Debug, Clone)]
pub struct QueryString {
    root: Node,
}

impl QueryString {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_bool(None, false)?;
        Ok(Self { root })
    }

    /// Relevance of `document` for this query, or `None` when it doesn't match.
    pub fn score(&self, document: &Value) -> Option<u32> {
        let mut fields = Fields::new();
        flatten("", document, &mut fields);
        self.root.score(&fields)
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.score(document).is_some()
    }
}
