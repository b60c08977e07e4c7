//! TPTP parser for clause normal form input
//!
//! Statements are split on their terminating `.`, `include` directives are
//! followed recursively and each `cnf(...)` statement is parsed with nom
//! into a name-level syntax tree before its symbols are interned.

use crate::error::ParseError;
use crate::logic::{
    CNFFormula, Clause, ClauseRole, FunctionSymbol, Interner, Literal, PredicateSymbol, Term,
    Variable,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, recognize, value},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Parsed clauses together with the interner holding their symbols
#[derive(Debug)]
pub struct ParsedProblem {
    pub formula: CNFFormula,
    pub interner: Interner,
}

/// Parse a TPTP file
pub fn parse_tptp_file(
    file_path: &str,
    include_dirs: &[&str],
    timeout: Option<Instant>,
) -> Result<ParsedProblem, ParseError> {
    let mut reader = Reader::new(include_dirs, timeout);
    reader.read_file(Path::new(file_path))?;
    Ok(reader.finish())
}

/// Parse TPTP content from a string; includes resolve against `.`
pub fn parse_tptp(
    input: &str,
    include_dirs: &[&str],
    timeout: Option<Instant>,
) -> Result<ParsedProblem, ParseError> {
    let mut reader = Reader::new(include_dirs, timeout);
    reader.read_content(input, Path::new("."))?;
    Ok(reader.finish())
}

#[derive(Debug, Clone, PartialEq)]
enum RawTerm {
    Variable(String),
    Function(String, Vec<RawTerm>),
}

#[derive(Debug, Clone, PartialEq)]
enum RawLiteral {
    Atom {
        predicate: String,
        args: Vec<RawTerm>,
        polarity: bool,
    },
    Equality {
        left: RawTerm,
        right: RawTerm,
        polarity: bool,
    },
    /// `$true` / `$false`, possibly negated
    Truth(bool),
}

#[derive(Debug, Clone, PartialEq)]
struct RawClause {
    name: String,
    role: String,
    literals: Vec<RawLiteral>,
}

struct Reader<'a> {
    include_dirs: &'a [&'a str],
    timeout: Option<Instant>,
    visited: HashSet<PathBuf>,
    interner: Interner,
    clauses: Vec<Clause>,
}

impl<'a> Reader<'a> {
    fn new(include_dirs: &'a [&'a str], timeout: Option<Instant>) -> Self {
        Reader {
            include_dirs,
            timeout,
            visited: HashSet::new(),
            interner: Interner::new(),
            clauses: Vec::new(),
        }
    }

    fn finish(self) -> ParsedProblem {
        ParsedProblem {
            formula: CNFFormula {
                clauses: self.clauses,
            },
            interner: self.interner,
        }
    }

    fn check_timeout(&self) -> Result<(), ParseError> {
        match self.timeout {
            Some(deadline) if Instant::now() > deadline => Err(ParseError::Timeout),
            _ => Ok(()),
        }
    }

    fn read_file(&mut self, path: &Path) -> Result<(), ParseError> {
        if !self.visited.insert(path.to_path_buf()) {
            return Ok(());
        }
        let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parent = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.read_content(&content, &parent)
    }

    fn read_content(&mut self, input: &str, current_dir: &Path) -> Result<(), ParseError> {
        let mut statement = String::new();

        for line in input.lines() {
            self.check_timeout()?;
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if !statement.is_empty() {
                statement.push(' ');
            }
            statement.push_str(line);

            // a statement may share a line with the next one
            while let Some(end) = statement_end(&statement) {
                let rest = statement[end + 1..].trim_start().to_string();
                statement.truncate(end + 1);
                self.read_statement(statement.trim(), current_dir)?;
                statement = rest;
            }
        }

        if !statement.trim().is_empty() {
            return Err(ParseError::Syntax {
                statement,
                message: "unterminated statement".to_string(),
            });
        }
        Ok(())
    }

    fn read_statement(&mut self, statement: &str, current_dir: &Path) -> Result<(), ParseError> {
        if statement.starts_with("include(") {
            let (_, filename) = parse_include(statement).map_err(|e| ParseError::Syntax {
                statement: statement.to_string(),
                message: format!("{:?}", e),
            })?;
            let path = find_include_file(filename, self.include_dirs, current_dir)?;
            return self.read_file(&path);
        }
        if statement.starts_with("cnf(") {
            let (_, raw) = parse_cnf_line(statement).map_err(|e| ParseError::Syntax {
                statement: statement.to_string(),
                message: format!("{:?}", e),
            })?;
            if let Some(clause) = self.intern_clause(raw) {
                self.clauses.push(clause);
            }
            return Ok(());
        }
        let kind = statement.split('(').next().unwrap_or(statement);
        Err(ParseError::Unsupported(format!(
            "{} statements must be clausified before model building",
            kind
        )))
    }

    /// `None` when the clause contains `$true`
    fn intern_clause(&mut self, raw: RawClause) -> Option<Clause> {
        let mut literals = Vec::with_capacity(raw.literals.len());
        for lit in raw.literals {
            match lit {
                RawLiteral::Truth(true) => return None,
                RawLiteral::Truth(false) => {}
                RawLiteral::Atom {
                    predicate,
                    args,
                    polarity,
                } => {
                    let args: Vec<Term> = args.iter().map(|t| self.intern_term(t)).collect();
                    let id = self.interner.intern_predicate(&predicate);
                    let symbol = PredicateSymbol::new(id, args.len() as u8);
                    literals.push(Literal {
                        predicate: symbol,
                        args,
                        polarity,
                    });
                }
                RawLiteral::Equality {
                    left,
                    right,
                    polarity,
                } => {
                    let left = self.intern_term(&left);
                    let right = self.intern_term(&right);
                    literals.push(Literal::equality(left, right, polarity));
                }
            }
        }
        let mut clause = Clause::with_role(literals, ClauseRole::from_tptp_role(&raw.role));
        clause.name = Some(raw.name);
        Some(clause)
    }

    fn intern_term(&mut self, term: &RawTerm) -> Term {
        match term {
            RawTerm::Variable(name) => {
                Term::Variable(Variable::new(self.interner.intern_variable(name)))
            }
            RawTerm::Function(name, args) => {
                let args: Vec<Term> = args.iter().map(|a| self.intern_term(a)).collect();
                let id = self.interner.intern_function(name);
                Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
            }
        }
    }
}

/// Remove a trailing `%` comment outside single quotes
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '%' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Index of the `.` ending the first complete statement
fn statement_end(statement: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quoted = false;
    for (i, c) in statement.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' | '[' if !quoted => depth += 1,
            ')' | ']' if !quoted => depth -= 1,
            '.' if !quoted && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn find_include_file(
    filename: &str,
    include_dirs: &[&str],
    current_dir: &Path,
) -> Result<PathBuf, ParseError> {
    let path = current_dir.join(filename);
    if path.exists() {
        return Ok(path);
    }
    for dir in include_dirs {
        let path = Path::new(dir).join(filename);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(ParseError::IncludeNotFound(filename.to_string()))
}

fn parse_include(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag("include")(input)?;
    let (input, _) = char('(')(input)?;
    let (input, filename) = delimited(char('\''), take_until("'"), char('\''))(input)?;
    let (input, _) = char(')')(input)?;
    let (input, _) = char('.')(input)?;
    Ok((input, filename))
}

fn parse_cnf_line(input: &str) -> IResult<&str, RawClause> {
    let (input, _) = tag("cnf")(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, name) = parse_name(input)?;
    let (input, _) = tuple((multispace0, char(','), multispace0))(input)?;
    let (input, role) = parse_role(input)?;
    let (input, _) = tuple((multispace0, char(','), multispace0))(input)?;
    let (input, literals) = parse_cnf_formula(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = parse_annotations(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    let (input, _) = char('.')(input)?;

    Ok((
        input,
        RawClause {
            name: strip_quotes(name).to_string(),
            role: role.to_string(),
            literals,
        },
    ))
}

/// <name> ::= <atomic_word> | <integer>
fn parse_name(input: &str) -> IResult<&str, &str> {
    alt((parse_single_quoted, take_while1(|c: char| c.is_alphanumeric() || c == '_')))(input)
}

fn parse_role(input: &str) -> IResult<&str, &str> {
    parse_lowercase_ident(input)
}

/// Disjunction of literals, possibly parenthesized
fn parse_cnf_formula(input: &str) -> IResult<&str, Vec<RawLiteral>> {
    alt((
        delimited(
            tuple((char('('), multispace0)),
            parse_cnf_formula,
            tuple((multispace0, char(')'))),
        ),
        separated_list1(tuple((multispace0, char('|'), multispace0)), parse_literal),
    ))(input)
}

fn parse_literal(input: &str) -> IResult<&str, RawLiteral> {
    let (input, _) = multispace0(input)?;
    alt((
        map(
            preceded(tuple((char('~'), multispace0)), parse_atom),
            negate,
        ),
        parse_atom,
    ))(input)
}

fn negate(lit: RawLiteral) -> RawLiteral {
    match lit {
        RawLiteral::Atom {
            predicate,
            args,
            polarity,
        } => RawLiteral::Atom {
            predicate,
            args,
            polarity: !polarity,
        },
        RawLiteral::Equality {
            left,
            right,
            polarity,
        } => RawLiteral::Equality {
            left,
            right,
            polarity: !polarity,
        },
        RawLiteral::Truth(b) => RawLiteral::Truth(!b),
    }
}

fn parse_atom(input: &str) -> IResult<&str, RawLiteral> {
    alt((
        value(RawLiteral::Truth(true), tag("$true")),
        value(RawLiteral::Truth(false), tag("$false")),
        parse_equation,
        parse_predicate,
    ))(input)
}

/// `s = t` or `s != t`
fn parse_equation(input: &str) -> IResult<&str, RawLiteral> {
    let (input, left) = parse_term(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = alt((tag("!="), tag("=")))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, right) = parse_term(input)?;
    Ok((
        input,
        RawLiteral::Equality {
            left,
            right,
            polarity: op == "=",
        },
    ))
}

fn parse_predicate(input: &str) -> IResult<&str, RawLiteral> {
    let (input, name) = parse_functor_name(input)?;
    let (input, args) = parse_arguments(input)?;
    Ok((
        input,
        RawLiteral::Atom {
            predicate: name,
            args,
            polarity: true,
        },
    ))
}

fn parse_arguments(input: &str) -> IResult<&str, Vec<RawTerm>> {
    if let Ok((input, _)) = char::<&str, nom::error::Error<&str>>('(')(input) {
        let (input, _) = multispace0(input)?;
        let (input, args) =
            separated_list0(tuple((multispace0, char(','), multispace0)), parse_term)(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, args))
    } else {
        Ok((input, Vec::new()))
    }
}

fn parse_term(input: &str) -> IResult<&str, RawTerm> {
    alt((
        map(parse_uppercase_ident, |name| RawTerm::Variable(name.to_string())),
        parse_function_term,
    ))(input)
}

fn parse_function_term(input: &str) -> IResult<&str, RawTerm> {
    let (input, name) = parse_functor_name(input)?;
    let (input, args) = parse_arguments(input)?;
    Ok((input, RawTerm::Function(name, args)))
}

fn parse_lowercase_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_lowercase()),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

fn parse_uppercase_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_uppercase() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Functions, constants and predicates: lower word, quoted word or number
fn parse_functor_name(input: &str) -> IResult<&str, String> {
    alt((
        map(parse_single_quoted, |s| strip_quotes(s).to_string()),
        map(parse_lowercase_ident, |s| s.to_string()),
        map(take_while1(|c: char| c.is_ascii_digit()), |s: &str| s.to_string()),
    ))(input)
}

fn parse_single_quoted(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('\'') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    let bytes = input.as_bytes();
    let mut pos = 1;
    while pos < bytes.len() {
        if bytes[pos] == b'\'' {
            if pos + 1 < bytes.len() && bytes[pos + 1] == b'\'' {
                pos += 2;
            } else {
                return Ok((&input[pos + 1..], &input[..pos + 1]));
            }
        } else {
            pos += 1;
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// <annotations> ::= ,<source><optional_info> | <nothing>
///
/// Annotation content is skipped by bracket matching.
fn parse_annotations(input: &str) -> IResult<&str, ()> {
    let Ok((input, _)) = char::<_, nom::error::Error<_>>(',')(input) else {
        return Ok((input, ()));
    };
    let mut depth = 0i32;
    let mut quoted = false;
    for (i, c) in input.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' | '[' if !quoted => depth += 1,
            ')' | ']' if !quoted => {
                if depth == 0 {
                    return Ok((&input[i..], ()));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Eof,
    )))
}
